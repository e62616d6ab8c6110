//! Label selection algebra.
//!
//! A selection chain such as `.one.(a|b)..two` is stored as written, left to
//! right, and evaluated right to left against the environment active at the
//! point of reference. Every label group contributes one label; a reset (a dot
//! with nothing after it) drops everything accumulated so far.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::context::Context;
use crate::grammar::{Label, Production};
use crate::utils::{GrammarError, Result};

/// One element of a selection chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionGroup {
    /// `.label` or `.(l1|l2)`: one of the labels becomes active
    Labels(Vec<Label>),
    /// A bare `.`: clears the environment
    Reset,
}

/// The chain of selection groups attached to a reference or group
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSelection {
    groups: Vec<SelectionGroup>,
}

impl LabelSelection {
    /// The empty selection, which filters nothing
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(groups: Vec<SelectionGroup>) -> Self {
        LabelSelection { groups }
    }

    /// A chain made of single-label groups, in source order
    pub fn labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        LabelSelection {
            groups: labels
                .into_iter()
                .map(|l| SelectionGroup::Labels(vec![Label::new(l.as_ref())]))
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn groups(&self) -> &[SelectionGroup] {
        &self.groups
    }

    /// Parse a dotted chain such as `.F.P`, `.(M|F)` or `.one.a..two.b`.
    /// The empty string is the empty selection.
    pub fn parse(chain: &str) -> Result<Self> {
        let malformed = |reason: &str| GrammarError::MalformedSelectionChain {
            chain: chain.to_string(),
            reason: reason.to_string(),
        };

        let mut groups = Vec::new();
        let mut chars = chain.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '.' {
                return Err(malformed(&format!("expected `.` but found `{}`", c)));
            }
            match chars.peek() {
                None | Some('.') => groups.push(SelectionGroup::Reset),
                Some('(') => {
                    chars.next();
                    let mut body = String::new();
                    let mut closed = false;
                    for c in chars.by_ref() {
                        if c == ')' {
                            closed = true;
                            break;
                        }
                        body.push(c);
                    }
                    if !closed {
                        return Err(malformed("unterminated label group"));
                    }
                    let mut labels = Vec::new();
                    for name in body.split('|').map(str::trim) {
                        if name.is_empty() {
                            return Err(malformed("empty label in group"));
                        }
                        if !name.chars().all(is_label_char) {
                            return Err(malformed(&format!("invalid label `{}`", name)));
                        }
                        labels.push(Label::new(name));
                    }
                    groups.push(SelectionGroup::Labels(labels));
                }
                Some(&c) if is_label_char(c) => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if !is_label_char(c) {
                            break;
                        }
                        name.push(c);
                        chars.next();
                    }
                    groups.push(SelectionGroup::Labels(vec![Label::new(&name)]));
                }
                Some(&c) => {
                    return Err(malformed(&format!("unexpected `{}` after `.`", c)));
                }
            }
        }

        Ok(LabelSelection { groups })
    }

    /// Evaluate the chain right to left on top of the context's active
    /// environment. Groups listing several labels pick one at random.
    pub fn resolve(&self, context: &mut Context) -> Environment {
        let mut environment = context.environment().clone();
        for group in self.groups.iter().rev() {
            match group {
                SelectionGroup::Reset => environment.clear(),
                SelectionGroup::Labels(labels) => match labels.as_slice() {
                    [] => {}
                    [only] => environment.insert(only.clone()),
                    _ => {
                        let index = context.get_random_number(0, labels.len() - 1);
                        environment.insert(labels[index].clone());
                    }
                },
            }
        }
        environment
    }
}

impl fmt::Display for LabelSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for group in &self.groups {
            match group {
                SelectionGroup::Reset => f.write_str(".")?,
                SelectionGroup::Labels(labels) if labels.len() == 1 => {
                    write!(f, ".{}", labels[0])?
                }
                SelectionGroup::Labels(labels) => {
                    let names: Vec<&str> = labels.iter().map(Label::name).collect();
                    write!(f, ".({})", names.join("|"))?
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn is_label_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// The set of labels active at some point of an expansion
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Environment {
    labels: Vec<Label>,
}

impl Environment {
    pub fn from_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut environment = Environment::default();
        for label in labels {
            environment.insert(Label::new(label.as_ref()));
        }
        environment
    }

    pub fn insert(&mut self, label: Label) {
        if !self.labels.contains(&label) {
            self.labels.push(label);
        }
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.labels.iter().any(|l| l.name() == name)
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Whether a production survives this environment. Unlabeled productions
    /// always do, and an empty environment filters nothing.
    pub fn admits(&self, production: &Production) -> bool {
        match production.label() {
            None => true,
            Some(label) => self.is_empty() || self.labels.contains(label),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.labels.is_empty() {
            return f.write_str("none");
        }
        for label in &self.labels {
            write!(f, ".{}", label)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Atom;
    use pretty_assertions::assert_eq;

    fn labels(names: &[&str]) -> SelectionGroup {
        SelectionGroup::Labels(names.iter().map(|n| Label::new(n)).collect())
    }

    #[test]
    fn test_parse_consecutive_labels() {
        let selection = LabelSelection::parse(".F.P").unwrap();
        assert_eq!(selection.groups(), &[labels(&["F"]), labels(&["P"])]);
    }

    #[test]
    fn test_parse_alternation_groups() {
        let selection = LabelSelection::parse(".(M|F).( S | P )").unwrap();
        assert_eq!(selection.groups(), &[labels(&["M", "F"]), labels(&["S", "P"])]);
        assert_eq!(selection.to_string(), ".(M|F).(S|P)");
    }

    #[test]
    fn test_parse_double_dot_and_trailing_dot() {
        let selection = LabelSelection::parse(".one.a..two.b.").unwrap();
        assert_eq!(
            selection.groups(),
            &[
                labels(&["one"]),
                labels(&["a"]),
                SelectionGroup::Reset,
                labels(&["two"]),
                labels(&["b"]),
                SelectionGroup::Reset,
            ]
        );
        assert_eq!(selection.to_string(), ".one.a..two.b.");
    }

    #[test]
    fn test_parse_empty_chain_is_no_selection() {
        assert!(LabelSelection::parse("").unwrap().is_empty());
    }

    #[test]
    fn test_malformed_chains_are_rejected() {
        for chain in ["a.b", ".(M|F", ".()", ".(M|)", ".-", ".(M F)"] {
            assert!(
                matches!(
                    LabelSelection::parse(chain),
                    Err(GrammarError::MalformedSelectionChain { .. })
                ),
                "{} should be rejected",
                chain
            );
        }
    }

    #[test]
    fn test_resolve_accumulates_on_inherited_environment() {
        let mut context = Context::with_seed(1);
        context.scoped(Environment::from_labels(["S"]), |context| {
            let environment = LabelSelection::labels(["M"]).resolve(context);
            assert_eq!(environment, Environment::from_labels(["S", "M"]));
        });
    }

    #[test]
    fn test_resolve_reads_right_to_left_through_resets() {
        let mut context = Context::with_seed(1);
        let selection = LabelSelection::parse(".one.a..two.b").unwrap();
        assert_eq!(
            selection.resolve(&mut context),
            Environment::from_labels(["a", "one"])
        );
    }

    #[test]
    fn test_reset_drops_inherited_labels() {
        let mut context = Context::with_seed(1);
        context.scoped(Environment::from_labels(["nz"]), |context| {
            let selection = LabelSelection::parse(".").unwrap();
            assert!(selection.resolve(context).is_empty());
        });
    }

    #[test]
    fn test_alternation_activates_exactly_one_label() {
        let selection = LabelSelection::parse(".(M|F)").unwrap();
        for seed in 0..20 {
            let mut context = Context::with_seed(seed);
            let environment = selection.resolve(&mut context);
            assert_eq!(environment.labels().len(), 1);
            assert!(environment.contains("M") || environment.contains("F"));
        }
    }

    #[test]
    fn test_admits_unlabeled_and_selected_productions() {
        let environment = Environment::from_labels(["a"]);
        let a = Production::labeled("a", vec![Atom::terminal("a")]);
        let b = Production::labeled("b", vec![Atom::terminal("b")]);
        let c = Production::of(vec![Atom::terminal("c")]);
        assert!(environment.admits(&a));
        assert!(!environment.admits(&b));
        assert!(environment.admits(&c));
        assert!(Environment::default().admits(&b));
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(Environment::default().to_string(), "none");
        assert_eq!(Environment::from_labels(["M", "M", "S"]).to_string(), ".M.S");
    }
}
