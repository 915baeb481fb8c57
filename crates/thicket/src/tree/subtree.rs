//! Position-independent, shareable tree nodes.
//!
//! A [`Subtree`] knows its size and the whitespace before it but not where it
//! sits in the document, so an edit only has to rebuild the nodes whose
//! extent it touches; every other subtree is shared by `Arc` between the old
//! and new trees. Each subtree also records the parse context it was built in,
//! which the parser checks before reusing it.

use std::fmt;
use std::sync::Arc;

use crate::length::Length;
use crate::lexer::{ScannerState, Token};
use crate::table::{FieldId, GrammarTable, ProductionId, StateId, Symbol};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Flags(u8);

impl Flags {
    pub(crate) const NAMED: u8 = 1;
    pub(crate) const VISIBLE: u8 = 1 << 1;
    pub(crate) const EXTRA: u8 = 1 << 2;
    pub(crate) const MISSING: u8 = 1 << 3;
    pub(crate) const LEAF: u8 = 1 << 4;
    pub(crate) const CHANGED: u8 = 1 << 5;

    fn has(self, bit: u8) -> bool {
        self.0 & bit != 0
    }

    fn with(self, bit: u8, on: bool) -> Self {
        if on {
            Self(self.0 | bit)
        } else {
            Self(self.0 & !bit)
        }
    }

    /// The flags that affect tree shape; `CHANGED` is bookkeeping.
    fn structural(self) -> u8 {
        self.0 & !Self::CHANGED
    }
}

/// Parse context of a reduced node.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NodeInfo {
    pub(crate) production: Option<ProductionId>,
    /// The state on top of the stack before the node's first token.
    pub(crate) parse_state: StateId,
    /// The lookahead that triggered the reduction.
    pub(crate) reduced_with: Symbol,
}

#[derive(Debug, Clone)]
pub(crate) struct SubtreeData {
    symbol: Symbol,
    padding: Length,
    size: Length,
    lookahead_bytes: usize,
    flags: Flags,
    error_count: usize,
    parse_state: StateId,
    /// The state after the node's last token was shifted.
    leaf_state: StateId,
    reduced_with: Symbol,
    production: Option<ProductionId>,
    scanner_before: ScannerState,
    scanner_after: ScannerState,
    children: Box<[Subtree]>,
    /// Start of each child, relative to the start of this node's padding.
    offsets: Box<[Length]>,
    fields: Option<Box<[Option<FieldId>]>>,
}

/// A reference-counted syntax tree node.
#[derive(Clone)]
pub(crate) struct Subtree(Arc<SubtreeData>);

struct Layout {
    offsets: Box<[Length]>,
    total: Length,
    lookahead_end: usize,
    error_count: usize,
}

fn layout(children: &[Subtree]) -> Layout {
    let mut offsets = Vec::with_capacity(children.len());
    let mut total = Length::ZERO;
    let mut lookahead_end = 0;
    let mut error_count = 0;
    for child in children {
        offsets.push(total);
        total = total + child.total();
        lookahead_end = lookahead_end.max(total.bytes + child.lookahead_bytes());
        error_count += child.error_count();
    }
    Layout {
        offsets: offsets.into_boxed_slice(),
        total,
        lookahead_end,
        error_count,
    }
}

impl Subtree {
    /// A leaf for a lexed token, shifted in `parse_state` into `leaf_state`.
    pub(crate) fn leaf(
        token: &Token,
        parse_state: StateId,
        leaf_state: StateId,
        table: &GrammarTable,
    ) -> Self {
        let symbol = token.symbol;
        let flags = Flags::default()
            .with(Flags::NAMED, table.is_named(symbol))
            .with(Flags::VISIBLE, table.is_visible(symbol))
            .with(Flags::EXTRA, token.is_extra)
            .with(Flags::LEAF, true);
        Self(Arc::new(SubtreeData {
            symbol,
            padding: token.padding(),
            size: token.size(),
            lookahead_bytes: token.lookahead_end.saturating_sub(token.end.bytes),
            flags,
            error_count: usize::from(symbol == Symbol::ERROR),
            parse_state,
            leaf_state,
            reduced_with: Symbol::END,
            production: None,
            scanner_before: token.scanner_before.clone(),
            scanner_after: token.scanner_after.clone(),
            children: Box::new([]),
            offsets: Box::new([]),
            fields: None,
        }))
    }

    /// A zero-width leaf standing in for a token the input lacks.
    pub(crate) fn missing(
        symbol: Symbol,
        parse_state: StateId,
        leaf_state: StateId,
        table: &GrammarTable,
    ) -> Self {
        let flags = Flags::default()
            .with(Flags::NAMED, table.is_named(symbol))
            .with(Flags::VISIBLE, table.is_visible(symbol))
            .with(Flags::MISSING, true)
            .with(Flags::LEAF, true);
        Self(Arc::new(SubtreeData {
            symbol,
            padding: Length::ZERO,
            size: Length::ZERO,
            lookahead_bytes: 1,
            flags,
            error_count: 1,
            parse_state,
            leaf_state,
            reduced_with: Symbol::END,
            production: None,
            scanner_before: ScannerState::default(),
            scanner_after: ScannerState::default(),
            children: Box::new([]),
            offsets: Box::new([]),
            fields: None,
        }))
    }

    /// An interior node. `fields` is either empty or parallel to `children`.
    pub(crate) fn node(
        symbol: Symbol,
        children: Vec<Subtree>,
        fields: Vec<Option<FieldId>>,
        info: NodeInfo,
        table: &GrammarTable,
    ) -> Self {
        let Layout {
            offsets,
            total,
            lookahead_end,
            error_count,
        } = layout(&children);
        let padding = children.first().map_or(Length::ZERO, Subtree::padding);
        let flags = Flags::default()
            .with(Flags::NAMED, table.is_named(symbol))
            .with(Flags::VISIBLE, table.is_visible(symbol));
        let fields = fields
            .iter()
            .any(Option::is_some)
            .then(|| fields.into_boxed_slice());
        Self(Arc::new(SubtreeData {
            symbol,
            padding,
            size: total - padding,
            lookahead_bytes: lookahead_end.saturating_sub(total.bytes),
            flags,
            error_count: error_count + usize::from(symbol == Symbol::ERROR),
            parse_state: info.parse_state,
            leaf_state: children.last().map_or(info.parse_state, Subtree::leaf_state),
            reduced_with: info.reduced_with,
            production: info.production,
            scanner_before: children
                .first()
                .map(|c| c.scanner_before().clone())
                .unwrap_or_default(),
            scanner_after: children
                .last()
                .map(|c| c.scanner_after().clone())
                .unwrap_or_default(),
            children: children.into_boxed_slice(),
            offsets,
            fields,
        }))
    }

    /// An `ERROR` node wrapping skipped or unparseable material.
    pub(crate) fn error(children: Vec<Subtree>, parse_state: StateId, table: &GrammarTable) -> Self {
        Self::node(
            Symbol::ERROR,
            children,
            Vec::new(),
            NodeInfo {
                production: None,
                parse_state,
                reduced_with: Symbol::END,
            },
            table,
        )
    }

    fn map(&self, f: impl FnOnce(&mut SubtreeData)) -> Self {
        let mut data = (*self.0).clone();
        f(&mut data);
        Self(Arc::new(data))
    }

    /// The same node flagged as an extra.
    pub(crate) fn into_extra(self) -> Self {
        if self.is_extra() {
            return self;
        }
        self.map(|d| d.flags = d.flags.with(Flags::EXTRA, true))
    }

    /// The same node presented as `symbol`.
    pub(crate) fn aliased(&self, symbol: Symbol, table: &GrammarTable) -> Self {
        self.map(|d| {
            d.symbol = symbol;
            d.flags = d
                .flags
                .with(Flags::NAMED, table.is_named(symbol))
                .with(Flags::VISIBLE, table.is_visible(symbol));
        })
    }

    /// The same node with its content size replaced.
    pub(crate) fn with_size(&self, size: Length) -> Self {
        self.map(|d| d.size = size)
    }

    /// The same node with new children, keeping its parse context.
    pub(crate) fn with_children(
        &self,
        children: Vec<Subtree>,
        fields: Vec<Option<FieldId>>,
        table: &GrammarTable,
    ) -> Self {
        let node = Self::node(
            self.symbol(),
            children,
            fields,
            NodeInfo {
                production: self.production(),
                parse_state: self.parse_state(),
                reduced_with: self.reduced_with(),
            },
            table,
        );
        node.map(|d| d.flags = self.0.flags.with(Flags::CHANGED, false))
    }

    /// The same node at an edited extent, marked as changed. Interior nodes
    /// take their lookahead and error count from the edited children; leaves
    /// keep theirs.
    pub(crate) fn edited(&self, padding: Length, size: Length, children: Vec<Subtree>) -> Self {
        self.map(|d| {
            d.padding = padding;
            d.size = size;
            if !children.is_empty() {
                let layout = layout(&children);
                d.lookahead_bytes = layout
                    .lookahead_end
                    .saturating_sub((padding + size).bytes);
                d.error_count = layout.error_count + usize::from(d.symbol == Symbol::ERROR);
                d.offsets = layout.offsets;
            }
            d.children = children.into_boxed_slice();
            d.flags = d.flags.with(Flags::CHANGED, true);
        })
    }

    pub(crate) fn symbol(&self) -> Symbol {
        self.0.symbol
    }

    pub(crate) fn padding(&self) -> Length {
        self.0.padding
    }

    pub(crate) fn size(&self) -> Length {
        self.0.size
    }

    /// Padding plus size.
    pub(crate) fn total(&self) -> Length {
        self.0.padding + self.0.size
    }

    pub(crate) fn lookahead_bytes(&self) -> usize {
        self.0.lookahead_bytes
    }

    pub(crate) fn error_count(&self) -> usize {
        self.0.error_count
    }

    pub(crate) fn is_named(&self) -> bool {
        self.0.flags.has(Flags::NAMED)
    }

    pub(crate) fn is_visible(&self) -> bool {
        self.0.flags.has(Flags::VISIBLE)
    }

    pub(crate) fn is_extra(&self) -> bool {
        self.0.flags.has(Flags::EXTRA)
    }

    pub(crate) fn is_missing(&self) -> bool {
        self.0.flags.has(Flags::MISSING)
    }

    pub(crate) fn is_leaf(&self) -> bool {
        self.0.flags.has(Flags::LEAF)
    }

    pub(crate) fn has_changes(&self) -> bool {
        self.0.flags.has(Flags::CHANGED)
    }

    pub(crate) fn is_error(&self) -> bool {
        self.0.symbol == Symbol::ERROR
    }

    pub(crate) fn parse_state(&self) -> StateId {
        self.0.parse_state
    }

    pub(crate) fn leaf_state(&self) -> StateId {
        self.0.leaf_state
    }

    pub(crate) fn reduced_with(&self) -> Symbol {
        self.0.reduced_with
    }

    pub(crate) fn production(&self) -> Option<ProductionId> {
        self.0.production
    }

    pub(crate) fn scanner_before(&self) -> &ScannerState {
        &self.0.scanner_before
    }

    pub(crate) fn scanner_after(&self) -> &ScannerState {
        &self.0.scanner_after
    }

    pub(crate) fn children(&self) -> &[Subtree] {
        &self.0.children
    }

    pub(crate) fn offsets(&self) -> &[Length] {
        &self.0.offsets
    }

    pub(crate) fn field_at(&self, index: usize) -> Option<FieldId> {
        self.0.fields.as_ref()?.get(index).copied().flatten()
    }

    /// The first leaf in document order, if the leftmost path ends in one.
    pub(crate) fn first_leaf(&self) -> Option<&Subtree> {
        let mut node = self;
        while !node.is_leaf() {
            node = node.children().first()?;
        }
        Some(node)
    }

    /// Identity of the shared allocation.
    pub(crate) fn id(&self) -> usize {
        Arc::as_ptr(&self.0).cast::<()>() as usize
    }

    pub(crate) fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Subtree {
    fn eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let (a, b) = (&*self.0, &*other.0);
        a.symbol == b.symbol
            && a.padding == b.padding
            && a.size == b.size
            && a.flags.structural() == b.flags.structural()
            && a.fields == b.fields
            && a.children == b.children
    }
}

impl Eq for Subtree {}

impl fmt::Debug for Subtree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Subtree");
        s.field("symbol", &self.0.symbol.0)
            .field("padding", &self.0.padding.bytes)
            .field("size", &self.0.size.bytes);
        if !self.0.children.is_empty() {
            s.field("children", &self.0.children);
        }
        s.finish()
    }
}
