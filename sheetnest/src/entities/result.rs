use crate::entities::SheetLayout;

/// Outcome of one nesting run.
///
/// Every free part instance of the input appears exactly once: either in some
/// sheet's placements (with `locked == false`) or in `unplaced`. Placements
/// pinned by the caller are echoed with `locked == true` and sit outside that
/// count.
#[derive(Clone, Debug, Default)]
pub struct NestingResult {
    pub sheets: Vec<SheetLayout>,
    /// Ids of parts that fit on no sheet.
    pub unplaced: Vec<String>,
    /// True when a [`CancelToken`](crate::util::CancelToken) stopped the run;
    /// the placements found so far are still valid.
    pub cancelled: bool,
}

impl NestingResult {
    /// Number of parts this run placed, pinned placements excluded.
    pub fn placed_count(&self) -> usize {
        self.sheets
            .iter()
            .flat_map(|sheet| &sheet.placements)
            .filter(|p| !p.locked)
            .count()
    }

    /// Placements across all sheets, pinned ones included.
    pub fn placements(&self) -> impl Iterator<Item = &crate::entities::Placement> {
        self.sheets.iter().flat_map(|sheet| sheet.placements.iter())
    }
}
