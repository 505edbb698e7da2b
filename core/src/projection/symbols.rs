//! Substitution of user symbols, functions and sequences.

use ecow::EcoString;
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use super::ProjectionError;
use crate::Vec;
use crate::tree::{ArenaError, Node, NodeKind, Tree, TreeArena};

/// Deepest chain of definitions followed before giving up.
const MAX_RESOLUTION_DEPTH: usize = 32;

/// Which user names get replaced by their definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SymbolicComputation {
    /// Every name; a missing definition becomes `Undefined`.
    #[default]
    ReplaceAllSymbolsWithDefinitionsOrUndefined,
    /// Only names that have a definition.
    ReplaceDefinedSymbolsWithDefinitions,
    /// Functions and sequences only, used when storing a new definition.
    ReplaceDefinedFunctionsWithDefinitions,
    DoNotReplaceAnySymbol,
    ReplaceAllSymbolsWithUndefined,
}

/// Where definitions come from.
///
/// `kind` is `UserSymbol`, `UserFunction` or `UserSequence`. Function and
/// sequence definitions hold `Parameter` leaves where the argument goes.
pub trait SymbolContext {
    fn definition(&self, kind: NodeKind, name: &str) -> Option<&Tree>;
}

/// A plain in-memory [`SymbolContext`].
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: HashMap<EcoString, Tree>,
    functions: HashMap<EcoString, Tree>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define_symbol(&mut self, name: impl Into<EcoString>, definition: Tree) -> Option<Tree> {
        self.symbols.insert(name.into(), definition)
    }

    /// `definition` uses `Parameter` for the argument, see [`parameterize`].
    pub fn define_function(
        &mut self,
        name: impl Into<EcoString>,
        definition: Tree,
    ) -> Option<Tree> {
        self.functions.insert(name.into(), definition)
    }

    pub fn remove(&mut self, name: &str) -> Option<Tree> {
        self.symbols
            .remove(name)
            .or_else(|| self.functions.remove(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name) || self.functions.contains_key(name)
    }

    pub fn clear(&mut self) {
        self.symbols.clear();
        self.functions.clear();
    }

    pub fn len(&self) -> usize {
        self.symbols.len() + self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SymbolContext for SymbolTable {
    fn definition(&self, kind: NodeKind, name: &str) -> Option<&Tree> {
        match kind {
            NodeKind::UserSymbol => self.symbols.get(name),
            NodeKind::UserFunction | NodeKind::UserSequence => self.functions.get(name),
            _ => None,
        }
    }
}

/// Turn every `UserSymbol(parameter)` of `tree` into a `Parameter` leaf.
pub fn parameterize(tree: &Tree, parameter: &str) -> Tree {
    let nodes: Vec<Node> = tree
        .nodes()
        .iter()
        .map(|node| {
            if node.kind == NodeKind::UserSymbol && node.name() == Some(parameter) {
                Node::leaf(NodeKind::Parameter)
            } else {
                node.clone()
            }
        })
        .collect();
    Tree::from_nodes(nodes)
}

/// Replace user names under `index` according to `policy`.
///
/// Function arguments are resolved before the call is expanded, and the
/// expansion is resolved in turn. Returns whether anything changed.
pub fn deep_replace_user_named(
    arena: &mut TreeArena,
    index: usize,
    symbols: &dyn SymbolContext,
    policy: SymbolicComputation,
) -> Result<bool, ProjectionError> {
    let mut resolver = Resolver {
        symbols,
        policy,
        in_progress: SmallVec::new(),
    };
    resolver.visit(arena, index)
}

struct Resolver<'s> {
    symbols: &'s dyn SymbolContext,
    policy: SymbolicComputation,
    /// Names whose definitions are being expanded, outermost first.
    in_progress: SmallVec<[EcoString; 8]>,
}

impl Resolver<'_> {
    fn visit(&mut self, arena: &mut TreeArena, index: usize) -> Result<bool, ProjectionError> {
        let mut changed = false;
        let mut child = index + 1;
        for _ in 0..arena.child_count(index) {
            changed |= self.visit(arena, child)?;
            child = arena.next_tree(child);
        }

        let node = arena.node(index);
        let kind = node.kind;
        if !kind.is_user_named() {
            return Ok(changed);
        }
        let name = EcoString::from(node.name().unwrap_or_default());
        let is_function = kind != NodeKind::UserSymbol;
        match self.policy {
            SymbolicComputation::DoNotReplaceAnySymbol => return Ok(changed),
            SymbolicComputation::ReplaceAllSymbolsWithUndefined => {
                arena.replace_with_node(index, Node::leaf(NodeKind::Undefined))?;
                return Ok(true);
            }
            SymbolicComputation::ReplaceDefinedFunctionsWithDefinitions if !is_function => {
                return Ok(changed);
            }
            _ => {}
        }

        let Some(definition) = self.symbols.definition(kind, &name) else {
            if self.policy == SymbolicComputation::ReplaceAllSymbolsWithDefinitionsOrUndefined {
                arena.replace_with_node(index, Node::leaf(NodeKind::Undefined))?;
                return Ok(true);
            }
            return Ok(changed);
        };
        if self.in_progress.contains(&name) || self.in_progress.len() >= MAX_RESOLUTION_DEPTH {
            return Err(ProjectionError::CircularDefinition { name });
        }

        let top = if is_function {
            push_with_argument(arena, definition, index + 1)?
        } else {
            arena.push_tree(definition)?
        };
        let index = arena.move_tree_over_tree(index, top)?;
        debug!(%name, ?kind, "user name resolved");
        self.in_progress.push(name);
        let result = self.visit(arena, index);
        self.in_progress.pop();
        result?;
        Ok(true)
    }
}

/// Push `definition` with each `Parameter` replaced by a copy of the tree
/// at `argument`.
fn push_with_argument(
    arena: &mut TreeArena,
    definition: &Tree,
    argument: usize,
) -> Result<usize, ArenaError> {
    let top = arena.len();
    for node in definition.nodes() {
        if node.kind == NodeKind::Parameter {
            arena.clone_tree(argument)?;
        } else {
            arena.push(node.clone())?;
        }
    }
    Ok(top)
}
