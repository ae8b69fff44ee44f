//! Detail-text rendering shared by the menu parsers.
//!
//! A detail text is a blank-line separated list of blocks. Each block starts
//! with an upper-cased header followed by `- item` lines, with children
//! indented under their parent.

/// One bulleted line; `depth` 0 is a top-level item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockItem {
    pub name: String,
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub header: String,
    pub items: Vec<BlockItem>,
}

impl Block {
    pub fn new(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, name: impl Into<String>, depth: usize) {
        self.items.push(BlockItem {
            name: name.into(),
            depth,
        });
    }
}

/// Render blocks; blocks without items or without a header are dropped.
pub fn render_detail(blocks: &[Block]) -> String {
    blocks
        .iter()
        .filter(|block| !block.items.is_empty() && !block.header.trim().is_empty())
        .map(|block| {
            let mut lines = vec![block.header.trim().to_uppercase()];
            lines.extend(
                block
                    .items
                    .iter()
                    .map(|item| format!("{}- {}", "  ".repeat(item.depth), item.name)),
            );
            lines.join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
