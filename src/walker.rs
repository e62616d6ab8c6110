use crate::collection::ProductionCollection;
use crate::context::Context;
use crate::grammar::{Atom, Document, GrammarConfig, Join, Production, Sequence};
use crate::selection::LabelSelection;
use crate::utils::{GrammarError, OptionExt, Result, TextBuffer};

/// Recursive expansion of a document into text.
///
/// The walker itself is stateless; everything that changes during a
/// generation lives in the [`Context`] and the output buffer.
#[derive(Debug, Clone)]
pub struct Walker<'d> {
    document: &'d Document,
    config: GrammarConfig,
}

impl<'d> Walker<'d> {
    pub fn new(document: &'d Document) -> Self {
        Walker {
            document,
            config: GrammarConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GrammarConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &GrammarConfig {
        &self.config
    }

    /// Expand the start symbol. Nothing is returned on failure, not even the
    /// text generated before the error.
    pub fn generate(&self, context: &mut Context) -> Result<String> {
        let start = self.document.start_symbol();
        log::debug!("generating `{}` with seed {}", start, context.seed());

        let mut out = TextBuffer::new();
        let productions = self
            .document
            .get(start)
            .ok_or_undefined(start, context.environment())?;
        self.expand_alternatives(start, productions, 0, context, &mut out)?;

        let text = out.into_string();
        if self.config.trim_output {
            Ok(text.trim().to_string())
        } else {
            Ok(text)
        }
    }

    /// Resolve `selection` on top of the active environment and expand one of
    /// `alternatives` inside it.
    fn expand_selected(
        &self,
        symbol: &str,
        alternatives: &[Production],
        selection: &LabelSelection,
        depth: usize,
        context: &mut Context,
        out: &mut TextBuffer,
    ) -> Result<()> {
        if selection.is_empty() {
            return self.expand_alternatives(symbol, alternatives, depth, context, out);
        }
        let environment = selection.resolve(context);
        log::trace!("`{}{}` opens selection {}", symbol, selection, environment);
        context.scoped(environment, |context| {
            self.expand_alternatives(symbol, alternatives, depth, context, out)
        })
    }

    fn expand_alternatives(
        &self,
        symbol: &str,
        alternatives: &[Production],
        depth: usize,
        context: &mut Context,
        out: &mut TextBuffer,
    ) -> Result<()> {
        if depth >= self.config.max_recursion_depth {
            return Err(GrammarError::RecursionLimitExceeded {
                symbol: symbol.to_string(),
                limit: self.config.max_recursion_depth,
            });
        }

        let collection = ProductionCollection::new(alternatives);
        let selected = collection.select_all(context.environment());
        log::trace!(
            "`{}`: {} of {} alternatives eligible",
            symbol,
            selected.len(),
            collection.len()
        );
        let production = selected.pick_random(context);
        self.expand_sequence(symbol, &production.sequence, depth + 1, context, out)
    }

    fn expand_sequence(
        &self,
        symbol: &str,
        sequence: &Sequence,
        depth: usize,
        context: &mut Context,
        out: &mut TextBuffer,
    ) -> Result<()> {
        // Positional choices in this sequence share one slot; nested groups get their own.
        let mut slot = None;
        for item in &sequence.items {
            if item.join == Join::Glue {
                out.glue();
            }
            self.expand_atom(symbol, &item.atom, &mut slot, depth, context, out)?;
        }
        Ok(())
    }

    fn expand_atom(
        &self,
        symbol: &str,
        atom: &Atom,
        slot: &mut Option<usize>,
        depth: usize,
        context: &mut Context,
        out: &mut TextBuffer,
    ) -> Result<()> {
        match atom {
            Atom::Terminal(text) => {
                out.push_word(text);
                Ok(())
            }
            Atom::Reference(reference) => {
                let productions = self
                    .document
                    .get(&reference.symbol)
                    .ok_or_undefined(&reference.symbol, context.environment())?;
                self.expand_selected(
                    &reference.symbol,
                    productions,
                    &reference.selection,
                    depth,
                    context,
                    out,
                )
            }
            Atom::Group(group) => self.expand_selected(
                symbol,
                &group.alternatives,
                &group.selection,
                depth,
                context,
                out,
            ),
            Atom::Positional(choices) => {
                if choices.is_empty() {
                    return Ok(());
                }
                // The first choice draws the slot; later ones wrap it to their own length.
                let index =
                    *slot.get_or_insert_with(|| context.get_random_number(0, choices.len() - 1));
                let mut inner = None;
                self.expand_atom(
                    symbol,
                    &choices[index % choices.len()],
                    &mut inner,
                    depth,
                    context,
                    out,
                )
            }
            Atom::Epsilon => Ok(()),
        }
    }
}
