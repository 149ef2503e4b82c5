//! JSON card catalog
//!
//! A catalog file holds every definition a battle can reference plus the
//! starting decks. Definitions are wrapped in `Arc` once at load time and
//! shared read-only with every instance built from them.

use crate::config::BattleConfig;
use crate::core::{Alteration, AlterationId, Card, CardId, PlayerId, Spell, SpellId, Tag, TagId};
use crate::game::conversion::ConversionRequest;
use crate::game::state::BattleState;
use crate::{CombatError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// One card of a deck and what it enters play with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckEntry {
    pub card: CardId,
    #[serde(default = "default_count")]
    pub count: u32,
    #[serde(default)]
    pub tags: Vec<TagId>,
    #[serde(default)]
    pub spells: Vec<SpellId>,
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckDefinition {
    pub name: String,
    #[serde(default)]
    pub player: Option<String>,
    pub cards: Vec<DeckEntry>,
}

impl DeckDefinition {
    pub fn total_cards(&self) -> u32 {
        self.cards.iter().map(|e| e.count).sum()
    }
}

/// On-disk shape of a catalog
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CatalogFile {
    cards: Vec<Card>,
    tags: Vec<Tag>,
    spells: Vec<Spell>,
    alterations: Vec<Alteration>,
    decks: Vec<DeckDefinition>,
}

/// Definitions indexed by id
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    cards: FxHashMap<CardId, Arc<Card>>,
    card_names: HashMap<String, CardId>,
    tags: FxHashMap<TagId, Arc<Tag>>,
    spells: FxHashMap<SpellId, Arc<Spell>>,
    alterations: FxHashMap<AlterationId, Arc<Alteration>>,
    decks: Vec<DeckDefinition>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CombatError::IoError(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("Catalog not found: {path:?}"),
            )));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Parse a catalog and check that every deck reference resolves
    pub fn from_json_str(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        let mut catalog = Catalog::new();
        for card in file.cards {
            catalog.add_card(card)?;
        }
        for tag in file.tags {
            catalog.add_tag(tag)?;
        }
        for spell in file.spells {
            catalog.add_spell(spell)?;
        }
        for alteration in file.alterations {
            catalog.add_alteration(alteration)?;
        }
        for deck in file.decks {
            catalog.add_deck(deck)?;
        }
        Ok(catalog)
    }

    pub fn add_card(&mut self, card: Card) -> Result<Arc<Card>> {
        if self.cards.contains_key(&card.id) {
            return Err(CombatError::ParseError(format!("duplicate card id {}", card.id)));
        }
        let card = Arc::new(card);
        self.card_names.insert(card.name.to_lowercase(), card.id);
        self.cards.insert(card.id, Arc::clone(&card));
        Ok(card)
    }

    pub fn add_tag(&mut self, tag: Tag) -> Result<Arc<Tag>> {
        if self.tags.contains_key(&tag.id) {
            return Err(CombatError::ParseError(format!("duplicate tag id {}", tag.id)));
        }
        let tag = Arc::new(tag);
        self.tags.insert(tag.id, Arc::clone(&tag));
        Ok(tag)
    }

    pub fn add_spell(&mut self, spell: Spell) -> Result<Arc<Spell>> {
        if self.spells.contains_key(&spell.id) {
            return Err(CombatError::ParseError(format!("duplicate spell id {}", spell.id)));
        }
        let spell = Arc::new(spell);
        self.spells.insert(spell.id, Arc::clone(&spell));
        Ok(spell)
    }

    pub fn add_alteration(&mut self, alteration: Alteration) -> Result<Arc<Alteration>> {
        if self.alterations.contains_key(&alteration.id) {
            return Err(CombatError::ParseError(format!(
                "duplicate alteration id {}",
                alteration.id
            )));
        }
        let alteration = Arc::new(alteration);
        self.alterations.insert(alteration.id, Arc::clone(&alteration));
        Ok(alteration)
    }

    /// Add a deck whose cards, tags and spells are already known
    pub fn add_deck(&mut self, deck: DeckDefinition) -> Result<()> {
        for entry in &deck.cards {
            self.resolve_entry(entry, None)?;
        }
        self.decks.push(deck);
        Ok(())
    }

    pub fn card(&self, id: CardId) -> Option<Arc<Card>> {
        self.cards.get(&id).cloned()
    }

    /// Look up a card by name (case-insensitive)
    pub fn card_by_name(&self, name: &str) -> Option<Arc<Card>> {
        self.card_names
            .get(&name.to_lowercase())
            .and_then(|id| self.card(*id))
    }

    pub fn tag(&self, id: TagId) -> Option<Arc<Tag>> {
        self.tags.get(&id).cloned()
    }

    pub fn tag_by_name(&self, name: &str) -> Option<Arc<Tag>> {
        self.tags.values().find(|t| t.name == name).cloned()
    }

    pub fn spell(&self, id: SpellId) -> Option<Arc<Spell>> {
        self.spells.get(&id).cloned()
    }

    pub fn alteration(&self, id: AlterationId) -> Option<Arc<Alteration>> {
        self.alterations.get(&id).cloned()
    }

    pub fn decks(&self) -> &[DeckDefinition] {
        &self.decks
    }

    pub fn card_count(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Make every alteration available to rules and spells of a battle
    pub fn install_alterations(&self, state: &mut BattleState) {
        for (id, alteration) in &self.alterations {
            state.alterations.insert(*id, Arc::clone(alteration));
        }
    }

    /// Resolve one deck entry into what conversion needs
    pub fn resolve_entry(&self, entry: &DeckEntry, owner: Option<PlayerId>) -> Result<ConversionRequest> {
        let card = self
            .card(entry.card)
            .ok_or_else(|| CombatError::ParseError(format!("deck references unknown card {}", entry.card)))?;
        let mut request = ConversionRequest::new(card, owner);
        for tag in &entry.tags {
            let tag = self
                .tag(*tag)
                .ok_or_else(|| CombatError::ParseError(format!("deck references unknown tag {tag}")))?;
            request.tags.push(tag);
        }
        for spell in &entry.spells {
            let spell = self
                .spell(*spell)
                .ok_or_else(|| CombatError::ParseError(format!("deck references unknown spell {spell}")))?;
            request.spells.push(spell);
        }
        Ok(request)
    }

    /// Every card of a deck, expanded by count, in deck order
    pub fn deck_requests(&self, deck: &DeckDefinition, owner: PlayerId) -> Result<Vec<ConversionRequest>> {
        let mut requests = Vec::new();
        for entry in &deck.cards {
            let request = self.resolve_entry(entry, Some(owner))?;
            for _ in 0..entry.count {
                requests.push(request.clone());
            }
        }
        Ok(requests)
    }

    /// Catalog-side sanity checks on a battle config
    pub fn check_config(&self, config: &BattleConfig) -> Result<()> {
        for deck in &self.decks {
            let characters = deck
                .cards
                .iter()
                .filter(|e| self.card(e.card).is_some_and(|c| c.is_character()))
                .map(|e| e.count as usize)
                .sum::<usize>();
            if characters == 0 {
                return Err(CombatError::ParseError(format!("deck '{}' has no character", deck.name)));
            }
            if characters > config.max_characters {
                return Err(CombatError::ParseError(format!(
                    "deck '{}' has {characters} characters, at most {} can be fielded",
                    deck.name, config.max_characters
                )));
            }
        }
        Ok(())
    }
}
