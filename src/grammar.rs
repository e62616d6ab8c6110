use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::context::Context;
use crate::selection::{Environment, LabelSelection};
use crate::utils::{GrammarError, OptionExt, Result};
use crate::walker::Walker;

/// A label name. Cheap to clone; compared by its exact spelling.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Label(Arc<str>);

impl Label {
    pub fn new(name: &str) -> Self {
        Label(Arc::from(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Label {
    fn from(name: &str) -> Self {
        Label::new(name)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an item attaches to the text emitted before it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Join {
    /// Separated from the previous word by a single space
    #[default]
    Space,
    /// Concatenated to the previous word (the `^` operator)
    Glue,
}

/// A reference to a non-terminal, optionally narrowed by a label selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub symbol: String,
    #[serde(default, skip_serializing_if = "LabelSelection::is_empty")]
    pub selection: LabelSelection,
}

/// An inline anonymous set of alternatives, `( a | b )`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub alternatives: Vec<Production>,
    #[serde(default, skip_serializing_if = "LabelSelection::is_empty")]
    pub selection: LabelSelection,
}

/// The smallest expandable unit of a sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Atom {
    /// Literal text, emitted verbatim
    Terminal(String),
    /// A non-terminal to expand
    Reference(Reference),
    /// A parenthesised sub-grammar
    Group(Group),
    /// `un,una`: alternatives picked by the slot shared across the sequence
    Positional(Vec<Atom>),
    /// Emits nothing
    Epsilon,
}

impl Atom {
    pub fn terminal(text: &str) -> Self {
        Atom::Terminal(text.to_string())
    }

    pub fn reference(symbol: &str) -> Self {
        Atom::Reference(Reference {
            symbol: symbol.to_string(),
            selection: LabelSelection::none(),
        })
    }

    pub fn selected(symbol: &str, selection: LabelSelection) -> Self {
        Atom::Reference(Reference {
            symbol: symbol.to_string(),
            selection,
        })
    }

    pub fn group(alternatives: Vec<Production>, selection: LabelSelection) -> Self {
        Atom::Group(Group {
            alternatives,
            selection,
        })
    }
}

/// An atom together with the way it joins the preceding text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub atom: Atom,
    #[serde(default, skip_serializing_if = "is_space")]
    pub join: Join,
}

fn is_space(join: &Join) -> bool {
    *join == Join::Space
}

impl Item {
    pub fn spaced(atom: Atom) -> Self {
        Item {
            atom,
            join: Join::Space,
        }
    }

    pub fn glued(atom: Atom) -> Self {
        Item {
            atom,
            join: Join::Glue,
        }
    }
}

impl From<Atom> for Item {
    fn from(atom: Atom) -> Self {
        Item::spaced(atom)
    }
}

/// An ordered list of items, expanded left to right
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    pub items: Vec<Item>,
}

impl Sequence {
    pub fn new(items: Vec<Item>) -> Self {
        Sequence { label: None, items }
    }

    pub fn labeled(label: &str, items: Vec<Item>) -> Self {
        Sequence {
            label: Some(Label::new(label)),
            items,
        }
    }
}

/// One alternative of a non-terminal or group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Production {
    pub sequence: Sequence,
}

impl Production {
    pub fn new(sequence: Sequence) -> Self {
        Production { sequence }
    }

    /// Unlabeled production built from atoms joined by spaces
    pub fn of(atoms: Vec<Atom>) -> Self {
        Production::new(Sequence::new(atoms.into_iter().map(Item::from).collect()))
    }

    /// Labeled production built from atoms joined by spaces
    pub fn labeled(label: &str, atoms: Vec<Atom>) -> Self {
        Production::new(Sequence::labeled(
            label,
            atoms.into_iter().map(Item::from).collect(),
        ))
    }

    /// The production that expands to nothing
    pub fn epsilon() -> Self {
        Production::of(vec![Atom::Epsilon])
    }

    pub fn label(&self) -> Option<&Label> {
        self.sequence.label.as_ref()
    }
}

/// Configuration options for generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrammarConfig {
    /// Maximum nesting of non-terminal and group expansions
    pub max_recursion_depth: usize,
    /// Whether to trim whitespace from output
    pub trim_output: bool,
}

impl Default for GrammarConfig {
    fn default() -> Self {
        GrammarConfig {
            max_recursion_depth: 100,
            trim_output: true,
        }
    }
}

impl GrammarConfig {
    /// Load a configuration from a JSON file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| GrammarError::Config(e.to_string()))
    }
}

/// A complete grammar: every non-terminal's alternatives plus the start symbol.
///
/// A document is read-only once built and can be shared between any number of
/// generations, each with its own [`Context`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    rules: HashMap<String, Vec<Production>>,
    start_symbol: String,
}

impl Document {
    /// Parse a grammar from source text
    pub fn parse(source: &str, start_symbol: &str) -> Result<Self> {
        crate::parser::parse_document(source, start_symbol)
    }

    /// Parse a grammar from a file
    pub fn from_file<P: AsRef<Path>>(path: P, start_symbol: &str) -> Result<Self> {
        let source = fs::read_to_string(path)?;
        Self::parse(&source, start_symbol)
    }

    /// Decode a document previously written with [`Document::to_json`]
    pub fn from_json(json: &str) -> Result<Self> {
        let document: Document =
            serde_json::from_str(json).map_err(|e| GrammarError::InvalidGrammar(e.to_string()))?;
        document.check_start_symbol()?;
        Ok(document)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| GrammarError::InvalidGrammar(e.to_string()))
    }

    /// Look up the alternatives of a non-terminal
    pub fn productions(&self, symbol: &str) -> Result<&[Production]> {
        self.get(symbol)
            .ok_or_undefined(symbol, &Environment::default())
    }

    pub fn get(&self, symbol: &str) -> Option<&[Production]> {
        self.rules.get(symbol).map(Vec::as_slice)
    }

    pub fn has_non_terminal(&self, name: &str) -> bool {
        self.rules.contains_key(name)
    }

    pub fn start_symbol(&self) -> &str {
        &self.start_symbol
    }

    /// Names of all defined non-terminals, sorted
    pub fn non_terminals(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.rules.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Non-terminals referenced somewhere in the grammar but never defined, sorted
    pub fn undefined_symbols(&self) -> Vec<String> {
        let mut missing = Vec::new();
        for productions in self.rules.values() {
            self.collect_undefined(productions, &mut missing);
        }
        missing.sort_unstable();
        missing.dedup();
        missing
    }

    fn collect_undefined(&self, productions: &[Production], missing: &mut Vec<String>) {
        for production in productions {
            for item in &production.sequence.items {
                self.collect_undefined_atom(&item.atom, missing);
            }
        }
    }

    fn collect_undefined_atom(&self, atom: &Atom, missing: &mut Vec<String>) {
        match atom {
            Atom::Reference(reference) => {
                if !self.rules.contains_key(&reference.symbol) {
                    missing.push(reference.symbol.clone());
                }
            }
            Atom::Group(group) => self.collect_undefined(&group.alternatives, missing),
            Atom::Positional(choices) => {
                for choice in choices {
                    self.collect_undefined_atom(choice, missing);
                }
            }
            Atom::Terminal(_) | Atom::Epsilon => {}
        }
    }

    /// Generate one string with the default configuration
    pub fn generate(&self, context: &mut Context) -> Result<String> {
        Walker::new(self).generate(context)
    }

    /// Generate one string with a custom configuration
    pub fn generate_with(&self, context: &mut Context, config: &GrammarConfig) -> Result<String> {
        Walker::new(self).with_config(config.clone()).generate(context)
    }

    fn check_start_symbol(&self) -> Result<()> {
        if self.rules.contains_key(&self.start_symbol) {
            Ok(())
        } else {
            Err(GrammarError::InvalidGrammar(format!(
                "start symbol `{}` is not defined",
                self.start_symbol
            )))
        }
    }
}

/// Builder for constructing Document instances
#[derive(Debug)]
pub struct DocumentBuilder {
    rules: HashMap<String, Vec<Production>>,
    start_symbol: String,
}

impl DocumentBuilder {
    pub fn new(start_symbol: &str) -> Self {
        DocumentBuilder {
            rules: HashMap::new(),
            start_symbol: start_symbol.to_string(),
        }
    }

    /// Add one alternative to a non-terminal
    pub fn production(mut self, non_terminal: &str, production: Production) -> Self {
        self.rules
            .entry(non_terminal.to_string())
            .or_default()
            .push(production);
        self
    }

    /// Add several alternatives to a non-terminal
    pub fn rule(mut self, non_terminal: &str, productions: Vec<Production>) -> Self {
        self.rules
            .entry(non_terminal.to_string())
            .or_default()
            .extend(productions);
        self
    }

    pub fn build(self) -> Result<Document> {
        let document = Document {
            rules: self.rules,
            start_symbol: self.start_symbol,
        };
        document.check_start_symbol()?;
        Ok(document)
    }
}
