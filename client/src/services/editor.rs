//! Immutable edits on the schedule tree.
//!
//! Every operation takes the current [`Schedule`] by reference and returns a
//! new one. Only the nodes on the path to the edited element are copied
//! (`Arc::make_mut` along the path); every sibling keeps pointing at the same
//! allocation as in the input, so `Arc::ptr_eq` holds for untouched nodes.
//!
//! Failure policy:
//! - `add_*` under an existing parent and `remove_*` never fail. Removing an
//!   index that does not exist is a no-op that returns an unchanged copy.
//! - `update_*`, `patch_*` and `add_*` under a missing parent return
//!   [`EditError::PathNotFound`]. That is a caller bug, not a validation
//!   problem, and is never shown to the user.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Block, BlockItem, Equipment, Participant, RiskFactor, Schedule};

/// Result type for tree edits.
pub type EditResult<T> = Result<T, EditError>;

/// Precondition failure of a tree edit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("No element at {path} (collection holds {len})")]
    PathNotFound { path: String, len: usize },
}

impl EditError {
    fn not_found(path: impl fmt::Display, len: usize) -> Self {
        Self::PathNotFound {
            path: path.to_string(),
            len,
        }
    }
}

// ==================== Paths ====================

/// Address of an item inside a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ItemPath {
    pub block: usize,
    pub item: usize,
}

impl ItemPath {
    pub fn new(block: usize, item: usize) -> Self {
        Self { block, item }
    }
}

impl fmt::Display for ItemPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blocks[{}].items[{}]", self.block, self.item)
    }
}

/// Address of a participant inside an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantPath {
    pub item: ItemPath,
    pub participant: usize,
}

impl ParticipantPath {
    pub fn new(block: usize, item: usize, participant: usize) -> Self {
        Self {
            item: ItemPath::new(block, item),
            participant,
        }
    }
}

impl fmt::Display for ParticipantPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.participants[{}]", self.item, self.participant)
    }
}

/// Equipment lives either directly on a block or on one of its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipmentOwner {
    Block(usize),
    Item(ItemPath),
}

impl fmt::Display for EquipmentOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EquipmentOwner::Block(i) => write!(f, "blocks[{}]", i),
            EquipmentOwner::Item(path) => path.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EquipmentPath {
    pub owner: EquipmentOwner,
    pub equipment: usize,
}

impl EquipmentPath {
    pub fn on_block(block: usize, equipment: usize) -> Self {
        Self {
            owner: EquipmentOwner::Block(block),
            equipment,
        }
    }

    pub fn on_item(block: usize, item: usize, equipment: usize) -> Self {
        Self {
            owner: EquipmentOwner::Item(ItemPath::new(block, item)),
            equipment,
        }
    }
}

impl fmt::Display for EquipmentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.equipment[{}]", self.owner, self.equipment)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RiskFactorPath {
    pub block: usize,
    pub risk: usize,
}

impl RiskFactorPath {
    pub fn new(block: usize, risk: usize) -> Self {
        Self { block, risk }
    }
}

impl fmt::Display for RiskFactorPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blocks[{}].risk_factors[{}]", self.block, self.risk)
    }
}

// ==================== Partial updates ====================

/// Partial update of a schedule's own fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulePatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub buffer_time: Option<i64>,
}

/// Partial update of a block's scalar fields. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlockPatch {
    pub name: Option<String>,
    pub duration: Option<i64>,
    pub location: Option<String>,
    pub block_type: Option<String>,
    pub complexity: Option<f64>,
    pub max_participants: Option<i64>,
    pub required_staff: Option<i64>,
    pub tech_break_duration: Option<i64>,
    pub start_time: Option<DateTime<Utc>>,
    pub order: Option<i64>,
}

impl BlockPatch {
    fn apply_to(&self, block: &mut Block) {
        if let Some(name) = &self.name {
            block.name = name.clone();
        }
        if self.duration.is_some() {
            block.duration = self.duration;
        }
        if self.location.is_some() {
            block.location = self.location.clone();
        }
        if self.block_type.is_some() {
            block.block_type = self.block_type.clone();
        }
        if self.complexity.is_some() {
            block.complexity = self.complexity;
        }
        if self.max_participants.is_some() {
            block.max_participants = self.max_participants;
        }
        if self.required_staff.is_some() {
            block.required_staff = self.required_staff;
        }
        if self.tech_break_duration.is_some() {
            block.tech_break_duration = self.tech_break_duration;
        }
        if self.start_time.is_some() {
            block.start_time = self.start_time;
        }
        if let Some(order) = self.order {
            block.order = order;
        }
    }
}

// ==================== Path helpers ====================

fn block_mut(schedule: &mut Schedule, index: usize) -> EditResult<&mut Block> {
    let len = schedule.blocks.len();
    schedule
        .blocks
        .get_mut(index)
        .map(Arc::make_mut)
        .ok_or_else(|| EditError::not_found(format_args!("blocks[{}]", index), len))
}

fn item_mut(schedule: &mut Schedule, path: ItemPath) -> EditResult<&mut BlockItem> {
    let block = block_mut(schedule, path.block)?;
    let len = block.items.len();
    block
        .items
        .get_mut(path.item)
        .map(Arc::make_mut)
        .ok_or_else(|| EditError::not_found(path, len))
}

fn equipment_list_mut(
    schedule: &mut Schedule,
    owner: EquipmentOwner,
) -> EditResult<&mut Vec<Arc<Equipment>>> {
    match owner {
        EquipmentOwner::Block(index) => Ok(&mut block_mut(schedule, index)?.equipment),
        EquipmentOwner::Item(path) => Ok(&mut item_mut(schedule, path)?.equipment),
    }
}

fn replace_at<T>(
    list: &mut [Arc<T>],
    index: usize,
    value: T,
    path: impl fmt::Display,
) -> EditResult<()> {
    let len = list.len();
    match list.get_mut(index) {
        Some(slot) => {
            *slot = Arc::new(value);
            Ok(())
        }
        None => Err(EditError::not_found(path, len)),
    }
}

/// Next `order` for an appended element: one past the largest existing
/// order, counting from 0 for an empty collection.
pub fn next_order(orders: impl IntoIterator<Item = i64>) -> i64 {
    orders.into_iter().fold(0, i64::max).saturating_add(1)
}

/// Run a removal on a copy; fall back to an unchanged copy of `schedule`
/// if the target does not exist.
fn remove_with<F>(schedule: &Schedule, what: impl fmt::Display, remove: F) -> Schedule
where
    F: FnOnce(&mut Schedule) -> bool,
{
    let mut next = schedule.clone();
    if remove(&mut next) {
        next
    } else {
        log::debug!("Ignoring removal of missing element {}", what);
        schedule.clone()
    }
}

fn remove_index<T>(list: &mut Vec<T>, index: usize) -> bool {
    if index < list.len() {
        list.remove(index);
        true
    } else {
        false
    }
}

// ==================== Schedule ====================

/// Update the schedule's own fields.
pub fn patch_schedule(schedule: &Schedule, patch: &SchedulePatch) -> Schedule {
    let mut next = schedule.clone();
    if let Some(name) = &patch.name {
        next.name = name.clone();
    }
    if patch.description.is_some() {
        next.description = patch.description.clone();
    }
    if patch.start_date.is_some() {
        next.start_date = patch.start_date;
    }
    if patch.end_date.is_some() {
        next.end_date = patch.end_date;
    }
    if patch.buffer_time.is_some() {
        next.buffer_time = patch.buffer_time;
    }
    next
}

// ==================== Blocks ====================

/// Append `block`, assigning it the next `order`.
pub fn add_block(schedule: &Schedule, mut block: Block) -> Schedule {
    let mut next = schedule.clone();
    block.order = next_order(next.blocks.iter().map(|b| b.order));
    next.blocks.push(Arc::new(block));
    next
}

/// Replace the block at `index` with `block`.
pub fn update_block(schedule: &Schedule, index: usize, block: Block) -> EditResult<Schedule> {
    let mut next = schedule.clone();
    replace_at(&mut next.blocks, index, block, format_args!("blocks[{}]", index))?;
    Ok(next)
}

/// Apply a partial update to the block at `index`.
pub fn patch_block(schedule: &Schedule, index: usize, patch: &BlockPatch) -> EditResult<Schedule> {
    let mut next = schedule.clone();
    patch.apply_to(block_mut(&mut next, index)?);
    Ok(next)
}

/// Remove the block at `index` along with everything it owns. Remaining
/// blocks keep their `order` values.
pub fn remove_block(schedule: &Schedule, index: usize) -> Schedule {
    remove_with(schedule, format_args!("blocks[{}]", index), |next| {
        remove_index(&mut next.blocks, index)
    })
}

// ==================== Items ====================

/// Append `item` to the block at `block_index`, assigning it the next `order`.
pub fn add_item(
    schedule: &Schedule,
    block_index: usize,
    mut item: BlockItem,
) -> EditResult<Schedule> {
    let mut next = schedule.clone();
    let block = block_mut(&mut next, block_index)?;
    item.order = next_order(block.items.iter().map(|i| i.order));
    if item.block_id.is_none() {
        item.block_id = block.id;
    }
    block.items.push(Arc::new(item));
    Ok(next)
}

pub fn update_item(schedule: &Schedule, path: ItemPath, item: BlockItem) -> EditResult<Schedule> {
    let mut next = schedule.clone();
    let block = block_mut(&mut next, path.block)?;
    replace_at(&mut block.items, path.item, item, path)?;
    Ok(next)
}

pub fn remove_item(schedule: &Schedule, path: ItemPath) -> Schedule {
    remove_with(schedule, path, |next| {
        block_mut(next, path.block)
            .map(|block| remove_index(&mut block.items, path.item))
            .unwrap_or(false)
    })
}

// ==================== Participants ====================

pub fn add_participant(
    schedule: &Schedule,
    item: ItemPath,
    mut participant: Participant,
) -> EditResult<Schedule> {
    let mut next = schedule.clone();
    let target = item_mut(&mut next, item)?;
    if participant.block_item_id.is_none() {
        participant.block_item_id = target.id;
    }
    target.participants.push(Arc::new(participant));
    Ok(next)
}

pub fn update_participant(
    schedule: &Schedule,
    path: ParticipantPath,
    participant: Participant,
) -> EditResult<Schedule> {
    let mut next = schedule.clone();
    let item = item_mut(&mut next, path.item)?;
    replace_at(&mut item.participants, path.participant, participant, path)?;
    Ok(next)
}

pub fn remove_participant(schedule: &Schedule, path: ParticipantPath) -> Schedule {
    remove_with(schedule, path, |next| {
        item_mut(next, path.item)
            .map(|item| remove_index(&mut item.participants, path.participant))
            .unwrap_or(false)
    })
}

// ==================== Equipment ====================

pub fn add_equipment(
    schedule: &Schedule,
    owner: EquipmentOwner,
    equipment: Equipment,
) -> EditResult<Schedule> {
    let mut next = schedule.clone();
    equipment_list_mut(&mut next, owner)?.push(Arc::new(equipment));
    Ok(next)
}

pub fn update_equipment(
    schedule: &Schedule,
    path: EquipmentPath,
    equipment: Equipment,
) -> EditResult<Schedule> {
    let mut next = schedule.clone();
    let list = equipment_list_mut(&mut next, path.owner)?;
    replace_at(list, path.equipment, equipment, path)?;
    Ok(next)
}

pub fn remove_equipment(schedule: &Schedule, path: EquipmentPath) -> Schedule {
    remove_with(schedule, path, |next| {
        equipment_list_mut(next, path.owner)
            .map(|list| remove_index(list, path.equipment))
            .unwrap_or(false)
    })
}

// ==================== Risk factors ====================

pub fn add_risk_factor(
    schedule: &Schedule,
    block_index: usize,
    mut risk: RiskFactor,
) -> EditResult<Schedule> {
    let mut next = schedule.clone();
    let block = block_mut(&mut next, block_index)?;
    if risk.block_id.is_none() {
        risk.block_id = block.id;
    }
    block.risk_factors.push(Arc::new(risk));
    Ok(next)
}

pub fn update_risk_factor(
    schedule: &Schedule,
    path: RiskFactorPath,
    risk: RiskFactor,
) -> EditResult<Schedule> {
    let mut next = schedule.clone();
    let block = block_mut(&mut next, path.block)?;
    replace_at(&mut block.risk_factors, path.risk, risk, path)?;
    Ok(next)
}

pub fn remove_risk_factor(schedule: &Schedule, path: RiskFactorPath) -> Schedule {
    remove_with(schedule, path, |next| {
        block_mut(next, path.block)
            .map(|block| remove_index(&mut block.risk_factors, path.risk))
            .unwrap_or(false)
    })
}

// ==================== Edit commands ====================

/// A single edit, as recorded by an edit session.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    PatchSchedule(SchedulePatch),
    AddBlock(Block),
    UpdateBlock { index: usize, block: Block },
    PatchBlock { index: usize, patch: BlockPatch },
    RemoveBlock(usize),
    AddItem { block: usize, item: BlockItem },
    UpdateItem { path: ItemPath, item: BlockItem },
    RemoveItem(ItemPath),
    AddParticipant { item: ItemPath, participant: Participant },
    UpdateParticipant { path: ParticipantPath, participant: Participant },
    RemoveParticipant(ParticipantPath),
    AddEquipment { owner: EquipmentOwner, equipment: Equipment },
    UpdateEquipment { path: EquipmentPath, equipment: Equipment },
    RemoveEquipment(EquipmentPath),
    AddRiskFactor { block: usize, risk: RiskFactor },
    UpdateRiskFactor { path: RiskFactorPath, risk: RiskFactor },
    RemoveRiskFactor(RiskFactorPath),
}

impl Edit {
    /// Produce the schedule that results from applying this edit to `schedule`.
    pub fn apply(&self, schedule: &Schedule) -> EditResult<Schedule> {
        match self {
            Edit::PatchSchedule(patch) => Ok(patch_schedule(schedule, patch)),
            Edit::AddBlock(block) => Ok(add_block(schedule, block.clone())),
            Edit::UpdateBlock { index, block } => update_block(schedule, *index, block.clone()),
            Edit::PatchBlock { index, patch } => patch_block(schedule, *index, patch),
            Edit::RemoveBlock(index) => Ok(remove_block(schedule, *index)),
            Edit::AddItem { block, item } => add_item(schedule, *block, item.clone()),
            Edit::UpdateItem { path, item } => update_item(schedule, *path, item.clone()),
            Edit::RemoveItem(path) => Ok(remove_item(schedule, *path)),
            Edit::AddParticipant { item, participant } => {
                add_participant(schedule, *item, participant.clone())
            }
            Edit::UpdateParticipant { path, participant } => {
                update_participant(schedule, *path, participant.clone())
            }
            Edit::RemoveParticipant(path) => Ok(remove_participant(schedule, *path)),
            Edit::AddEquipment { owner, equipment } => {
                add_equipment(schedule, *owner, equipment.clone())
            }
            Edit::UpdateEquipment { path, equipment } => {
                update_equipment(schedule, *path, equipment.clone())
            }
            Edit::RemoveEquipment(path) => Ok(remove_equipment(schedule, *path)),
            Edit::AddRiskFactor { block, risk } => add_risk_factor(schedule, *block, risk.clone()),
            Edit::UpdateRiskFactor { path, risk } => {
                update_risk_factor(schedule, *path, risk.clone())
            }
            Edit::RemoveRiskFactor(path) => Ok(remove_risk_factor(schedule, *path)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Schedule {
        Schedule::new("Fest")
            .with_block(Block {
                order: 1,
                ..Block::new("Setup", 30)
            })
            .with_block(Block {
                order: 4,
                ..Block::new("Show", 90).with_item(BlockItem::new("Opening"))
            })
    }

    #[test]
    fn test_next_order() {
        assert_eq!(next_order(std::iter::empty()), 1);
        assert_eq!(next_order([3, 1, 2]), 4);
        assert_eq!(next_order([-4, -2]), 1);
    }

    #[test]
    fn test_add_block_appends_after_max_order() {
        let next = add_block(&sample(), Block::draft());
        assert_eq!(next.blocks.len(), 3);
        assert_eq!(next.blocks[2].order, 5);
    }

    #[test]
    fn test_update_block_out_of_range() {
        let err = update_block(&sample(), 7, Block::draft()).unwrap_err();
        assert_eq!(
            err,
            EditError::PathNotFound {
                path: "blocks[7]".into(),
                len: 2
            }
        );
    }

    #[test]
    fn test_patch_block_keeps_children() {
        let schedule = sample();
        let patch = BlockPatch {
            name: Some("Main show".into()),
            complexity: Some(0.4),
            ..Default::default()
        };
        let next = patch_block(&schedule, 1, &patch).unwrap();
        assert_eq!(next.blocks[1].name, "Main show");
        assert_eq!(next.blocks[1].duration, Some(90));
        assert!(Arc::ptr_eq(&schedule.blocks[1].items[0], &next.blocks[1].items[0]));
        assert!(Arc::ptr_eq(&schedule.blocks[0], &next.blocks[0]));
    }

    #[test]
    fn test_add_item_inherits_block_id() {
        let mut schedule = sample();
        Arc::make_mut(&mut schedule.blocks[1]).id = Some(crate::api::BlockId(12));
        let next = add_item(&schedule, 1, BlockItem::new("Encore")).unwrap();
        let item = &next.blocks[1].items[1];
        assert_eq!(item.block_id, Some(crate::api::BlockId(12)));
        assert_eq!(item.order, 1);
    }

    #[test]
    fn test_equipment_owner_paths() {
        let schedule = sample();
        let next =
            add_equipment(&schedule, EquipmentOwner::Block(0), Equipment::new("Truss")).unwrap();
        let next = add_equipment(
            &next,
            EquipmentOwner::Item(ItemPath::new(1, 0)),
            Equipment::new("Mic"),
        )
        .unwrap();
        assert_eq!(next.blocks[0].equipment[0].name, "Truss");
        assert_eq!(next.blocks[1].items[0].equipment[0].name, "Mic");

        let missing = EquipmentOwner::Item(ItemPath::new(0, 3));
        let err = add_equipment(&next, missing, Equipment::new("x")).unwrap_err();
        assert!(matches!(
            err,
            EditError::PathNotFound { ref path, .. } if path == "blocks[0].items[3]"
        ));
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let schedule = sample();
        let next = remove_risk_factor(&schedule, RiskFactorPath::new(0, 0));
        assert_eq!(next, schedule);
        assert!(Arc::ptr_eq(&schedule.blocks[0], &next.blocks[0]));
    }

    #[test]
    fn test_edit_command_dispatch() {
        let schedule = sample();
        let next = Edit::RemoveBlock(0).apply(&schedule).unwrap();
        assert_eq!(next.blocks.len(), 1);
        assert_eq!(next.blocks[0].order, 4);

        let result = Edit::UpdateItem {
            path: ItemPath::new(0, 5),
            item: BlockItem::new("x"),
        }
        .apply(&schedule);
        assert!(result.is_err());
    }
}
