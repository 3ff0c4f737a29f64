/// Order book slab decoding (bids / asks accounts)
///
/// A slab is a critbit tree stored as a flat array of 72-byte nodes. We do
/// not walk the tree: every leaf below `bump_index` is a live order, so a
/// linear scan of leaf nodes yields the book.
use super::details::MarketDetails;
use super::orderbook::Level;
use crate::errors::SwapError;
use borsh::BorshDeserialize;
use std::collections::BTreeMap;

const ACCOUNT_HEAD_PADDING: usize = 5;
const ACCOUNT_FLAGS_SIZE: usize = 8;
const SLAB_HEADER_SIZE: usize = 32;
const NODE_SIZE: usize = 72;
const ACCOUNT_TAIL_PADDING: usize = 7;

const NODE_TAG_LEAF: u32 = 2;

#[allow(dead_code)]
#[derive(Debug, Clone, BorshDeserialize)]
struct SlabHeader {
    bump_index: u64,
    free_list_len: u64,
    free_list_head: u32,
    root_node: u32,
    leaf_count: u64,
}

#[allow(dead_code)]
#[derive(Debug, Clone, BorshDeserialize)]
struct LeafNode {
    tag: u32,
    owner_slot: u8,
    fee_tier: u8,
    padding: [u8; 2],
    key: u128,
    owner: [u8; 32],
    quantity: u64,
    client_order_id: u64,
}

/// One resting order in lot units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabOrder {
    pub price_lots: u64,
    pub quantity_lots: u64,
}

/// Decode every live order from a bids or asks account
pub fn decode_slab(data: &[u8]) -> Result<Vec<SlabOrder>, SwapError> {
    let nodes_start = ACCOUNT_HEAD_PADDING + ACCOUNT_FLAGS_SIZE + SLAB_HEADER_SIZE;
    if data.len() < nodes_start + ACCOUNT_TAIL_PADDING {
        return Err(SwapError::Encoding(format!(
            "slab account too small: {} bytes",
            data.len()
        )));
    }

    let mut header_bytes = &data[ACCOUNT_HEAD_PADDING + ACCOUNT_FLAGS_SIZE..nodes_start];
    let header = SlabHeader::deserialize(&mut header_bytes)
        .map_err(|e| SwapError::Encoding(format!("slab header: {}", e)))?;

    let nodes_end = data.len() - ACCOUNT_TAIL_PADDING;
    let capacity = (nodes_end - nodes_start) / NODE_SIZE;
    let node_count = (header.bump_index as usize).min(capacity);

    let mut orders = Vec::with_capacity(node_count);
    for index in 0..node_count {
        let offset = nodes_start + index * NODE_SIZE;
        let mut node_bytes = &data[offset..offset + NODE_SIZE];
        let leaf = LeafNode::deserialize(&mut node_bytes)
            .map_err(|e| SwapError::Encoding(format!("slab node {}: {}", index, e)))?;

        if leaf.tag != NODE_TAG_LEAF {
            continue;
        }

        orders.push(SlabOrder {
            price_lots: (leaf.key >> 64) as u64,
            quantity_lots: leaf.quantity,
        });
    }

    Ok(orders)
}

/// Aggregate orders into decimal L2 levels, best price first
pub fn to_levels(orders: &[SlabOrder], descending: bool, details: &MarketDetails) -> Vec<Level> {
    let mut by_price: BTreeMap<u64, u64> = BTreeMap::new();
    for order in orders {
        *by_price.entry(order.price_lots).or_insert(0) += order.quantity_lots;
    }

    let to_level = |(price_lots, quantity_lots): (&u64, &u64)| {
        Level::new(
            details.price_lots_to_number(*price_lots),
            details.size_lots_to_number(*quantity_lots),
        )
    };

    if descending {
        by_price.iter().rev().map(to_level).collect()
    } else {
        by_price.iter().map(to_level).collect()
    }
}
