//! Pure layout computations: where a transaction and its UTXOs sit on the
//! canvas, how they move when dragged, and the geometry of the connector
//! curves between them.
//!
//! Nothing here suspends or takes locks. The graph applies the results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::graph::TransactionGraph;
use crate::types::{Point, TransactionNode, UtxoKey, UtxoNode};

/// Fraction of the horizontal gap used to offset connector control points.
const CONTROL_POINT_FACTOR: f64 = 0.7;

/// Box dimensions and spacing of the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    pub tx_width: f64,
    pub tx_height: f64,
    /// Vertical distance between neighbouring UTXOs when they overflow the box.
    pub utxo_gap: f64,
    /// Vertical position of a freshly laid out transaction.
    pub top_offset: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            tx_width: 150.0,
            tx_height: 150.0,
            utxo_gap: 50.0,
            top_offset: 150.0,
        }
    }
}

/// Which side of a transaction box a UTXO hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Input,
    Output,
}

/// A cubic connector from a transaction edge to a UTXO.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Connector {
    pub start: Point,
    pub control_start: Point,
    pub control_end: Point,
    pub end: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UtxoPlacement {
    pub key: UtxoKey,
    pub position: Point,
    pub distance: Point,
    pub connector: Connector,
}

/// Positions computed for one transaction and its UTXOs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxLayout {
    pub tx_hash: String,
    pub position: Point,
    pub inputs: Vec<UtxoPlacement>,
    pub outputs: Vec<UtxoPlacement>,
}

/// Whether a UTXO was produced inside the graph or only consumed by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UtxoOrigin {
    InternallyProduced,
    ExternalInput,
}

// ==============================================================================
// Placement
// ==============================================================================

/// Lay out a transaction horizontally centered on `screen_center_x`.
///
/// Inputs, followed by reference inputs, sit one box width to the left;
/// outputs (by ascending index) two box widths to the right. UTXOs are spread evenly over the box height,
/// or spaced `utxo_gap` apart and centered on the box when they do not fit.
pub fn layout_transaction(
    tx: &TransactionNode,
    screen_center_x: f64,
    config: &LayoutConfig,
) -> TxLayout {
    let position = Point::new(screen_center_x - config.tx_width / 2.0, config.top_offset);

    let inputs: Vec<UtxoKey> = tx
        .inputs
        .iter()
        .chain(&tx.reference_inputs)
        .cloned()
        .collect();
    let mut outputs = tx.outputs.clone();
    outputs.sort_by_key(|key| key.index);

    TxLayout {
        tx_hash: tx.tx_hash.clone(),
        position,
        inputs: place_side(&inputs, position, Side::Input, config),
        outputs: place_side(&outputs, position, Side::Output, config),
    }
}

fn place_side(
    keys: &[UtxoKey],
    tx_position: Point,
    side: Side,
    config: &LayoutConfig,
) -> Vec<UtxoPlacement> {
    let dx = match side {
        Side::Input => -config.tx_width,
        Side::Output => 2.0 * config.tx_width,
    };
    let anchor = anchor(tx_position, side, config);

    vertical_offsets(keys.len(), config)
        .into_iter()
        .zip(keys)
        .map(|(dy, key)| {
            let distance = Point::new(dx, dy);
            let position = tx_position + distance;
            UtxoPlacement {
                key: key.clone(),
                position,
                distance,
                connector: connector(anchor, position, side),
            }
        })
        .collect()
}

/// Offsets from the transaction's top edge for `count` stacked UTXOs.
pub fn vertical_offsets(count: usize, config: &LayoutConfig) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let n = count as f64;
    let spread = (n - 1.0) * config.utxo_gap;
    if spread <= config.tx_height {
        let step = config.tx_height / (n + 1.0);
        (0..count).map(|k| (k as f64 + 1.0) * step).collect()
    } else {
        let margin = (spread - config.tx_height) / 2.0;
        (0..count)
            .map(|k| k as f64 * config.utxo_gap - margin)
            .collect()
    }
}

// ==============================================================================
// Dragging
// ==============================================================================

/// Move a transaction to `new_position`, carrying along every input and
/// output it owns so that each keeps its stored distance.
///
/// Returns the keys of the UTXOs that moved.
pub fn drag_transaction(
    tx: &mut TransactionNode,
    utxos: &mut HashMap<UtxoKey, UtxoNode>,
    new_position: Point,
) -> Vec<UtxoKey> {
    tx.position = new_position;

    let mut moved = Vec::new();
    for key in tx
        .inputs
        .iter()
        .chain(&tx.reference_inputs)
        .chain(&tx.outputs)
    {
        let Some(utxo) = utxos.get_mut(key) else {
            continue;
        };
        if utxo.owner.as_deref() != Some(tx.tx_hash.as_str()) {
            continue;
        }
        utxo.position = new_position + utxo.distance;
        moved.push(key.clone());
    }
    moved
}

/// Recompute connectors after their UTXO end moved to `new_position`.
///
/// Each connector keeps its start and the height of its first control
/// point; only the horizontal pull and the far end follow the UTXO.
pub fn drag_utxo(connectors: &[Connector], new_position: Point, side: Side) -> Vec<Connector> {
    connectors
        .iter()
        .map(|c| {
            let mut moved = connector(c.start, new_position, side);
            moved.control_start.y = c.control_start.y;
            moved
        })
        .collect()
}

// ==============================================================================
// Connector Geometry
// ==============================================================================

/// Point on the transaction box where connectors of `side` attach.
pub fn anchor(tx_position: Point, side: Side, config: &LayoutConfig) -> Point {
    let y = tx_position.y + config.tx_height / 2.0;
    match side {
        Side::Input => Point::new(tx_position.x, y),
        Side::Output => Point::new(tx_position.x + config.tx_width, y),
    }
}

/// Connector from `anchor` to a UTXO at `utxo_position`.
pub fn connector(anchor: Point, utxo_position: Point, side: Side) -> Connector {
    let pull = (anchor.x - utxo_position.x).abs() * CONTROL_POINT_FACTOR;
    let (start_dx, end_dx) = match side {
        Side::Output => (pull, -pull),
        Side::Input => (-pull, pull),
    };
    Connector {
        start: anchor,
        control_start: Point::new(anchor.x + start_dx, anchor.y),
        control_end: Point::new(utxo_position.x + end_dx, utxo_position.y),
        end: utxo_position,
    }
}

// ==============================================================================
// Classification
// ==============================================================================

/// Classify a UTXO against the current graph snapshot. Derived per query,
/// never cached.
pub fn classify_utxo(graph: &TransactionGraph, key: &UtxoKey) -> UtxoOrigin {
    if graph.is_output(key) {
        UtxoOrigin::InternallyProduced
    } else {
        UtxoOrigin::ExternalInput
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::tx_node;

    fn config() -> LayoutConfig {
        LayoutConfig::default()
    }

    #[test]
    fn single_utxo_sits_at_half_height() {
        assert_eq!(vertical_offsets(1, &config()), vec![75.0]);
    }

    #[test]
    fn four_utxos_fit_evenly() {
        // 3 * 50 == 150, so they still fit inside the box.
        let offsets = vertical_offsets(4, &config());
        assert_eq!(offsets, vec![30.0, 60.0, 90.0, 120.0]);
    }

    #[test]
    fn overflowing_utxos_are_centered() {
        // 5 outputs: spread 200 > 150, margin 25.
        let offsets = vertical_offsets(5, &config());
        assert_eq!(offsets, vec![-25.0, 25.0, 75.0, 125.0, 175.0]);
        let middle = offsets[2];
        assert_eq!(middle, config().tx_height / 2.0);
    }

    #[test]
    fn no_utxos_no_offsets() {
        assert!(vertical_offsets(0, &config()).is_empty());
    }

    #[test]
    fn transaction_is_centered_on_screen() {
        let tx = tx_node("t", &[("a", 0)], 2);
        let layout = layout_transaction(&tx, 500.0, &config());

        assert_eq!(layout.position, Point::new(425.0, 150.0));
        assert_eq!(layout.inputs[0].position, Point::new(275.0, 225.0));
        assert_eq!(layout.inputs[0].distance, Point::new(-150.0, 75.0));
        assert_eq!(layout.outputs[0].position, Point::new(725.0, 200.0));
        assert_eq!(layout.outputs[1].distance, Point::new(300.0, 100.0));
    }

    #[test]
    fn reference_inputs_follow_spent_inputs() {
        let mut tx = tx_node("t", &[("a", 0)], 1);
        tx.reference_inputs.push(UtxoKey::new("r", 3));
        let layout = layout_transaction(&tx, 500.0, &config());

        assert_eq!(layout.inputs.len(), 2);
        assert_eq!(layout.inputs[1].key, UtxoKey::new("r", 3));
        assert_eq!(layout.inputs[1].distance, Point::new(-150.0, 100.0));
    }

    #[test]
    fn outputs_are_laid_out_by_index() {
        let mut tx = tx_node("t", &[], 3);
        tx.outputs.reverse();
        let layout = layout_transaction(&tx, 0.0, &config());
        let indices: Vec<u32> = layout.outputs.iter().map(|p| p.key.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn output_connector_bends_toward_utxo() {
        let c = connector(Point::new(100.0, 50.0), Point::new(200.0, 80.0), Side::Output);
        assert_eq!(c.control_start, Point::new(170.0, 50.0));
        assert_eq!(c.control_end, Point::new(130.0, 80.0));
        assert_eq!(c.end, Point::new(200.0, 80.0));
    }

    #[test]
    fn input_connector_is_mirrored() {
        let c = connector(Point::new(100.0, 50.0), Point::new(0.0, 20.0), Side::Input);
        assert_eq!(c.control_start, Point::new(30.0, 50.0));
        assert_eq!(c.control_end, Point::new(70.0, 20.0));
    }

    #[test]
    fn drag_utxo_keeps_anchor_and_first_control_height() {
        let original = Connector {
            start: Point::new(100.0, 50.0),
            control_start: Point::new(140.0, 42.0),
            control_end: Point::new(150.0, 60.0),
            end: Point::new(200.0, 60.0),
        };
        let moved = drag_utxo(&[original], Point::new(300.0, 90.0), Side::Output);

        assert_eq!(moved[0].start, original.start);
        assert_eq!(moved[0].control_start, Point::new(240.0, 42.0));
        assert_eq!(moved[0].control_end, Point::new(160.0, 90.0));
        assert_eq!(moved[0].end, Point::new(300.0, 90.0));
    }
}
