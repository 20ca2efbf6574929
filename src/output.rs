//! Output topology.

use smithay::utils::{Logical, Point, Rectangle};

/// Output handle.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Copy, Clone, Debug)]
pub struct OutputId(u64);

/// Display output, typically a screen.
#[derive(Debug)]
pub struct Output {
    pub id: OutputId,
    pub name: String,
    pub geometry: Rectangle<i32, Logical>,
}

/// All known outputs.
#[derive(Debug, Default)]
pub struct Outputs {
    outputs: Vec<Output>,
    next_id: u64,
}

impl Outputs {
    /// Add a new output.
    pub fn add(&mut self, name: impl Into<String>, geometry: Rectangle<i32, Logical>) -> OutputId {
        let id = OutputId(self.next_id);
        self.next_id += 1;

        self.outputs.push(Output { id, name: name.into(), geometry });

        id
    }

    /// Remove an output.
    pub fn remove(&mut self, id: OutputId) -> Option<Output> {
        let index = self.outputs.iter().position(|output| output.id == id)?;
        Some(self.outputs.remove(index))
    }

    pub fn get(&self, id: OutputId) -> Option<&Output> {
        self.outputs.iter().find(|output| output.id == id)
    }

    /// Output a window with the specified geometry is considered to occupy.
    ///
    /// This is the output containing the window's center, falling back to the
    /// one with the biggest overlap and finally to the first output.
    pub fn central_output(&self, geometry: Rectangle<i32, Logical>) -> Option<OutputId> {
        let center = geometry.loc + Point::from((geometry.size.w / 2, geometry.size.h / 2));
        if let Some(output) = self.outputs.iter().find(|output| output.geometry.contains(center)) {
            return Some(output.id);
        }

        let mut best: Option<(&Output, i64)> = None;
        for output in &self.outputs {
            let overlap = match output.geometry.intersection(geometry) {
                Some(overlap) => overlap.size.w as i64 * overlap.size.h as i64,
                None => 0,
            };

            if best.map_or(true, |(_, best_overlap)| overlap > best_overlap) {
                best = Some((output, overlap));
            }
        }

        best.map(|(output, _)| output.id)
    }
}
