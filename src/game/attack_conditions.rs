//! Attack eligibility

use crate::core::{CardInstance, InstanceId, Player, PlayerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackTarget {
    Character(InstanceId),
    Base(PlayerId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackCheck {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AttackCheck {
    fn allowed() -> Self {
        AttackCheck {
            allowed: true,
            reason: None,
        }
    }

    fn denied(reason: impl Into<String>) -> Self {
        AttackCheck {
            allowed: false,
            reason: Some(reason.into()),
        }
    }
}

/// Whether `attacker` may attack `target`
///
/// `defender` is the player owning the target; it only matters for base
/// attacks, which are refused while that player still fields characters.
pub fn can_attack(
    attacker: &CardInstance,
    target: AttackTarget,
    defender: &Player,
    ignore_conditions: bool,
) -> AttackCheck {
    if !attacker.can_attack() {
        return AttackCheck::denied(format!("{} cannot attack right now", attacker.name()));
    }
    match target {
        AttackTarget::Character(_) => AttackCheck::allowed(),
        AttackTarget::Base(_) => can_attack_base(defender, ignore_conditions),
    }
}

pub fn can_attack_base(defender: &Player, ignore_conditions: bool) -> AttackCheck {
    if ignore_conditions || defender.characters.is_empty() {
        AttackCheck::allowed()
    } else {
        AttackCheck::denied(format!(
            "{} still has {} character(s) on the battlefield",
            defender.name,
            defender.characters.len()
        ))
    }
}

/// Damage dealt to a base by an attack of strength `amount`
pub fn base_damage(amount: f64) -> u32 {
    (amount / 2.0).floor().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Card, CardId};
    use std::sync::Arc;

    fn attacker() -> CardInstance {
        let card = Arc::new(Card::character(CardId::new(1), "Brute", 10, 5.0, 0.0));
        CardInstance::new(InstanceId::new(1), card, Some(PlayerId::new(1)))
    }

    #[test]
    fn test_base_protected_while_characters_remain() {
        let mut defender = Player::new(PlayerId::new(2), "Bob");
        defender.characters.push(InstanceId::new(7));
        let brute = attacker();

        let check = can_attack(&brute, AttackTarget::Base(defender.id), &defender, false);
        assert!(!check.allowed);
        assert!(check.reason.is_some());

        assert!(can_attack(&brute, AttackTarget::Base(defender.id), &defender, true).allowed);
        assert!(can_attack(&brute, AttackTarget::Character(InstanceId::new(7)), &defender, false).allowed);

        defender.characters.clear();
        assert!(can_attack(&brute, AttackTarget::Base(defender.id), &defender, false).allowed);
    }

    #[test]
    fn test_exhausted_attacker_is_refused() {
        let defender = Player::new(PlayerId::new(2), "Bob");
        let mut brute = attacker();
        brute.is_exhausted = true;
        assert!(!can_attack(&brute, AttackTarget::Base(defender.id), &defender, true).allowed);
    }

    #[test]
    fn test_base_damage_is_halved_and_floored() {
        assert_eq!(base_damage(5.0), 2);
        assert_eq!(base_damage(8.0), 4);
        assert_eq!(base_damage(1.0), 0);
        assert_eq!(base_damage(-3.0), 0);
    }
}
