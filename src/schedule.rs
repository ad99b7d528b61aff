use jiff::{SignedDuration, Timestamp};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    catalog::ProgramCatalog,
    channel::{Channel, ItemRef, OrderingMode, Program},
    duration::Ticks,
    enrich::SlotEnricher,
    error::Result,
    shuffle::permute,
};

/// One airing of a program on a channel's timeline, as handed to guides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Slot {
    pub item_ref: ItemRef,
    pub title: String,
    pub start_time: Timestamp,
    pub end_time: Timestamp,
    pub duration: Ticks,
    /// How far into the slot the query instant was; zero for guide listings.
    pub elapsed: Ticks,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub production_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub is_movie: bool,
    pub is_series: bool,
}

impl Slot {
    pub fn bare(
        item_ref: ItemRef,
        title: String,
        start_time: Timestamp,
        end_time: Timestamp,
        duration: Ticks,
    ) -> Self {
        Self {
            item_ref,
            title,
            start_time,
            end_time,
            duration,
            elapsed: Ticks::ZERO,
            episode_title: None,
            overview: None,
            season_number: None,
            episode_number: None,
            production_year: None,
            image_ref: None,
            is_movie: false,
            is_series: false,
        }
    }

    fn from_airing(airing: Airing) -> Result<Self> {
        Ok(Self::bare(
            airing.program.item_ref,
            airing.program.name,
            airing.start.to_timestamp()?,
            airing.end.to_timestamp()?,
            airing.program.duration,
        ))
    }
}

/// A guide listing for one channel over `[start, end)`.
#[derive(Debug, Clone, Serialize)]
pub struct Schedule {
    pub channel: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub slots: Vec<Slot>,
}

/// A program placed on the timeline, in ticks since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Airing {
    pub program: Program,
    pub start: Ticks,
    pub end: Ticks,
    /// Index of the cycle this airing belongs to, counted from the anchor.
    pub cycle: i64,
}

/// Where a streaming client should seek to join a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayPosition {
    pub item_ref: ItemRef,
    pub name: String,
    pub start_position: Ticks,
    pub remaining: Ticks,
    pub slot_end: Timestamp,
}

/// Seed of the shuffle used for `cycle`. Cycle zero uses the bare channel id.
pub fn cycle_seed(channel_id: &str, cycle: i64) -> String {
    if cycle == 0 {
        channel_id.to_string()
    } else {
        format!("{channel_id}{cycle}")
    }
}

fn order_for_cycle(channel: &Channel, programs: &[Program], cycle: i64) -> Vec<Program> {
    match channel.ordering {
        OrderingMode::Sequential => programs.to_vec(),
        OrderingMode::Shuffle => permute(programs, &cycle_seed(&channel.id, cycle)),
    }
}

/// Index of the program playing at `position` within one cycle, and how far
/// into that program `position` falls.
fn locate(order: &[Program], position: Ticks) -> Option<(usize, Ticks)> {
    order
        .iter()
        .enumerate()
        .scan(Ticks::ZERO, |elapsed, (index, program)| {
            let begin = *elapsed;
            *elapsed = begin + program.duration;
            Some((index, begin, *elapsed))
        })
        .find(|&(_, _, end)| end > position)
        .map(|(index, begin, _)| (index, position - begin))
}

/// Lays `programs` out on `channel`'s timeline and returns every airing that
/// intersects `[start, end)`, in chronological order.
///
/// The first airing may begin before `start` and the last may run past
/// `end`. Only airings inside the window are produced, however long the
/// cycle is. Airings whose end would not fit in `Ticks` are not produced.
///
/// A window starting before the channel's anchor is folded forward onto
/// cycle 0. In shuffle mode its cycles are then numbered from the window
/// start, so it can disagree with a window starting at or after the anchor
/// about which permutation plays at a given instant.
pub fn materialize(
    channel: &Channel,
    programs: &[Program],
    start: Ticks,
    end: Ticks,
) -> Vec<Airing> {
    if start >= end {
        return Vec::new();
    }
    let programs: Vec<Program> = programs
        .iter()
        .filter(|program| program.duration.is_positive())
        .cloned()
        .collect();
    if programs.is_empty() {
        return Vec::new();
    }

    let Some(cycle_length) = programs
        .iter()
        .try_fold(Ticks::ZERO, |total, program| total.checked_add(program.duration))
    else {
        warn!(channel = %channel.id, "cycle length overflows");
        return Vec::new();
    };

    let Some(offset) = start.checked_sub(Ticks::since_epoch(channel.anchor)) else {
        warn!(channel = %channel.id, "window is out of range of the anchor");
        return Vec::new();
    };
    let (cycles, position) = offset.modulo(cycle_length);
    // before the anchor, the window folds onto cycle 0
    let mut cycle = cycles.max(0);

    let mut order = order_for_cycle(channel, &programs, cycle);
    let Some((mut index, start_offset)) = locate(&order, position) else {
        return Vec::new();
    };
    let Some(mut cursor) = start.checked_sub(start_offset) else {
        warn!(channel = %channel.id, "timeline runs past the start of time");
        return Vec::new();
    };

    let mut airings = Vec::new();
    while cursor < end {
        if index == order.len() {
            index = 0;
            cycle += 1;
            if channel.ordering == OrderingMode::Shuffle {
                order = order_for_cycle(channel, &programs, cycle);
            }
        }

        let program = &order[index];
        let Some(program_end) = cursor.checked_add(program.duration) else {
            warn!(channel = %channel.id, "timeline runs past the end of time");
            break;
        };
        if program_end > start {
            airings.push(Airing {
                program: program.clone(),
                start: cursor,
                end: program_end,
                cycle,
            });
        }
        cursor = program_end;
        index += 1;
    }
    airings
}

/// Computes channel timetables from the catalog and decorates them with
/// metadata. Holds no mutable state; clones share collaborators.
#[derive(Clone)]
pub struct ScheduleEngine {
    catalog: ProgramCatalog,
    enricher: SlotEnricher,
}

impl ScheduleEngine {
    pub fn new(catalog: ProgramCatalog, enricher: SlotEnricher) -> Self {
        Self { catalog, enricher }
    }

    async fn airings(&self, channel: &Channel, start: Timestamp, end: Timestamp) -> Vec<Airing> {
        if start >= end {
            return Vec::new();
        }
        let programs = self.catalog.resolve(channel).await;
        materialize(
            channel,
            &programs,
            Ticks::since_epoch(start),
            Ticks::since_epoch_ceil(end),
        )
    }

    pub async fn generate_schedule(
        &self,
        channel: &Channel,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Vec<Slot>> {
        let slots = self
            .airings(channel, start, end)
            .await
            .into_iter()
            .map(Slot::from_airing)
            .collect::<Result<Vec<_>>>()?;
        debug!(channel = %channel.id, %start, %end, slots = slots.len(), "generated schedule");
        Ok(self.enricher.enrich_all(slots).await)
    }

    pub async fn schedule(
        &self,
        channel: &Channel,
        start: Timestamp,
        end: Timestamp,
    ) -> Result<Schedule> {
        Ok(Schedule {
            channel: channel.id.clone(),
            start,
            end,
            slots: self.generate_schedule(channel, start, end).await?,
        })
    }

    pub async fn now_playing(&self, channel: &Channel, now: Timestamp) -> Result<Option<Slot>> {
        let end = now.checked_add(SignedDuration::from_mins(1))?;
        let slots = self.generate_schedule(channel, now, end).await?;
        Ok(slots.into_iter().next().map(|mut slot| {
            slot.elapsed = Ticks::between(slot.start_time, now);
            slot
        }))
    }

    /// The item to stream at `now` and the offset to seek to. Skips metadata.
    pub async fn play_position(
        &self,
        channel: &Channel,
        now: Timestamp,
    ) -> Result<Option<PlayPosition>> {
        let end = now.checked_add(SignedDuration::from_mins(1))?;
        let Some(airing) = self.airings(channel, now, end).await.into_iter().next() else {
            return Ok(None);
        };

        let now_ticks = Ticks::since_epoch(now);
        Ok(Some(PlayPosition {
            start_position: now_ticks - airing.start,
            remaining: airing.end - now_ticks,
            slot_end: airing.end.to_timestamp()?,
            item_ref: airing.program.item_ref,
            name: airing.program.name,
        }))
    }
}
