use std::borrow::Cow;
use std::cell::OnceCell;
use std::collections::HashMap;

use crate::context::Context;
use crate::grammar::Production;
use crate::selection::Environment;

/// Positions of the productions of a collection, grouped by label.
#[derive(Debug, Clone, Default)]
struct LabelIndex<'a> {
    unlabeled: Vec<usize>,
    by_label: HashMap<&'a str, Vec<usize>>,
}

/// The alternatives available at one expansion point, indexed by label.
///
/// The index is built on the first filtering under a non-empty environment,
/// so expansions with no active labels never pay for it. Filtering never
/// mutates a collection; it builds a narrower one.
#[derive(Debug, Clone)]
pub struct ProductionCollection<'a> {
    productions: Vec<&'a Production>,
    index: OnceCell<LabelIndex<'a>>,
}

impl<'a> ProductionCollection<'a> {
    pub fn new<I>(productions: I) -> Self
    where
        I: IntoIterator<Item = &'a Production>,
    {
        ProductionCollection {
            productions: productions.into_iter().collect(),
            index: OnceCell::new(),
        }
    }

    fn index(&self) -> &LabelIndex<'a> {
        self.index.get_or_init(|| {
            let mut index = LabelIndex::default();
            for (position, production) in self.productions.iter().enumerate() {
                match production.label() {
                    Some(label) => index
                        .by_label
                        .entry(label.name())
                        .or_default()
                        .push(position),
                    None => index.unlabeled.push(position),
                }
            }
            index
        })
    }

    pub fn len(&self) -> usize {
        self.productions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.productions.is_empty()
    }

    pub fn productions(&self) -> &[&'a Production] {
        &self.productions
    }

    /// Keep the unlabeled productions plus those whose label is active, each
    /// once and in their original order. An empty environment keeps everything.
    pub fn select_all(&self, environment: &Environment) -> Cow<'_, Self> {
        if environment.is_empty() {
            return Cow::Borrowed(self);
        }
        let index = self.index();
        let mut selected = index.unlabeled.clone();
        for label in environment.labels() {
            if let Some(indices) = index.by_label.get(label.name()) {
                selected.extend(indices);
            }
        }
        selected.sort_unstable();
        selected.dedup();
        Cow::Owned(ProductionCollection::new(
            selected.into_iter().map(|position| self.productions[position]),
        ))
    }

    /// Pick one production uniformly. When nothing survived the selection the
    /// result is a production that generates nothing.
    pub fn pick_random(&self, context: &mut Context) -> Cow<'a, Production> {
        if self.productions.is_empty() {
            log::debug!(
                "every alternative excluded by selection {}, producing nothing",
                context.environment()
            );
            return Cow::Owned(Production::epsilon());
        }
        let index = context.get_random_number(0, self.productions.len() - 1);
        log::trace!(
            "picked alternative {} of {} under {}",
            index,
            self.productions.len(),
            context.environment()
        );
        Cow::Borrowed(self.productions[index])
    }
}
