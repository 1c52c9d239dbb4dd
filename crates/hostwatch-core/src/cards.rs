//! Card reconciliation: one persistent card per host.
//!
//! The first snapshot for a host builds its card subtree; every later one
//! patches the same nodes in place. Snapshots for different hosts may arrive
//! in any order and are matched purely by the sanitized host key.

use std::collections::HashMap;

use crate::color::{auto_contrast, color_interpolate, Rgb, RED_THRESHOLD};
use crate::fmt::{format_mib_as_gib, format_timestamp, time_ago_at};
use crate::model::SnapshotRecord;
use crate::timers::TimerSet;
use crate::view::{Field, NodeKind, ViewError, ViewHandle};

/// Age at which a card turns stale.
pub const STALE_AFTER_SECS: f64 = 300.0;

/// Lower-cased host name with every non-alphanumeric character replaced by `_`.
pub fn sanitize(host: &str) -> String {
    host.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// View id of the card node for `host`.
pub fn card_id(host: &str) -> String {
    format!("card-{}", sanitize(host))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No snapshot seen yet.
    Absent,
    Fresh,
    Stale,
}

impl Freshness {
    /// Classify from the last snapshot time. Pure function of elapsed time.
    pub fn at(last_seen: Option<f64>, now: f64) -> Freshness {
        match last_seen {
            None => Freshness::Absent,
            Some(ts) if now - ts >= STALE_AFTER_SECS => Freshness::Stale,
            Some(_) => Freshness::Fresh,
        }
    }

    fn colour(self) -> Rgb {
        match self {
            Freshness::Stale => Rgb::ALERT,
            _ => Rgb::NEUTRAL,
        }
    }
}

// ============================================================
// Card face: everything a snapshot puts on a card
// ============================================================

#[derive(Debug, Clone, PartialEq)]
pub struct GpuFace {
    pub text: String,
    pub background: Rgb,
    pub foreground: Rgb,
}

/// A usage line with its bar.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageLine {
    pub text: String,
    /// Bar width in percent, clamped to `0..=100`.
    pub width: f64,
    pub colour: Rgb,
}

/// Text and colours derived from one snapshot, independent of any view.
#[derive(Debug, Clone, PartialEq)]
pub struct CardFace {
    pub title: String,
    pub cpu: UsageLine,
    pub memory: UsageLine,
    pub gpu: UsageLine,
    pub boxes: Vec<GpuFace>,
    pub timestamp: String,
}

fn usage_line(text: String, percent: f64) -> UsageLine {
    UsageLine {
        text,
        width: percent.clamp(0.0, 100.0),
        colour: color_interpolate(percent / 100.0, RED_THRESHOLD),
    }
}

impl CardFace {
    pub fn of(rec: &SnapshotRecord) -> CardFace {
        let gpu_mean = rec.cuda_mean();
        let boxes = rec
            .cuda
            .iter()
            .enumerate()
            .map(|(i, usage)| {
                let background = color_interpolate(usage / 100.0, RED_THRESHOLD);
                GpuFace {
                    text: format_mib_as_gib(rec.cuda_free_at(i)),
                    background,
                    foreground: auto_contrast(background),
                }
            })
            .collect();

        CardFace {
            title: rec.host.clone(),
            cpu: usage_line(
                format!(
                    "CPU: {:.0}% ({:.0}Cores free)",
                    rec.cpu,
                    rec.cpu_free.unwrap_or(0.0)
                ),
                rec.cpu,
            ),
            memory: usage_line(
                format!(
                    "MEM: {:.0}% ({}GiB free)",
                    rec.memory,
                    format_mib_as_gib(rec.memory_free.unwrap_or(0.0))
                ),
                rec.memory,
            ),
            gpu: usage_line(
                format!(
                    "GPU: {:.0}% ({}GiB free)",
                    gpu_mean,
                    format_mib_as_gib(rec.cuda_free_total())
                ),
                gpu_mean,
            ),
            boxes,
            timestamp: format!("Last Update: {}", format_timestamp(rec.timestamp)),
        }
    }
}

// ============================================================
// Engine
// ============================================================

/// Node ids making up one card.
#[derive(Debug, Clone)]
struct CardIds {
    key: String,
    card: String,
    title: String,
    cpu: String,
    cpu_bar: String,
    mem: String,
    mem_bar: String,
    gpu: String,
    gpu_bar: String,
    gpu_row: String,
    ts: String,
    ago: String,
}

impl CardIds {
    fn new(key: &str) -> Self {
        Self {
            key: key.to_string(),
            card: format!("card-{key}"),
            title: format!("title-{key}"),
            cpu: format!("cpu-{key}"),
            cpu_bar: format!("cpu-bar-{key}"),
            mem: format!("mem-{key}"),
            mem_bar: format!("mem-bar-{key}"),
            gpu: format!("gpu-{key}"),
            gpu_bar: format!("gpu-bar-{key}"),
            gpu_row: format!("gpu-row-{key}"),
            ts: format!("ts-{key}"),
            ago: format!("ago-{key}"),
        }
    }

    fn gpu_box(&self, i: usize) -> String {
        format!("gpu-{}-{i}", self.key)
    }
}

#[derive(Debug, Clone)]
struct Card {
    host: String,
    ids: CardIds,
    last_seen: f64,
    freshness: Freshness,
    devices: usize,
}

/// Owns every card's bookkeeping and time-ago timer.
#[derive(Debug)]
pub struct CardEngine {
    container: String,
    cards: HashMap<String, Card>,
    arrival: Vec<String>,
    timers: TimerSet<String>,
}

impl CardEngine {
    /// Engine placing cards under the `container` node.
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            cards: HashMap::new(),
            arrival: Vec::new(),
            timers: TimerSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Card node ids in the order hosts were first seen.
    pub fn card_ids(&self) -> Vec<String> {
        self.arrival
            .iter()
            .filter_map(|k| self.cards.get(k))
            .map(|c| c.ids.card.clone())
            .collect()
    }

    /// Host name shown on a card.
    pub fn host_of(&self, card_id: &str) -> Option<&str> {
        let key = card_id.strip_prefix("card-")?;
        self.cards.get(key).map(|c| c.host.as_str())
    }

    pub fn freshness(&self, host: &str) -> Freshness {
        self.cards
            .get(&sanitize(host))
            .map(|c| c.freshness)
            .unwrap_or(Freshness::Absent)
    }

    /// Earliest instant at which [`CardEngine::tick`] has work to do.
    pub fn next_due(&self) -> Option<f64> {
        self.timers.next_due()
    }

    /// Reconcile a batch of snapshots. Returns how many cards were created.
    pub fn apply_all<V: ViewHandle>(
        &mut self,
        view: &mut V,
        records: &[SnapshotRecord],
        now: f64,
    ) -> Result<usize, ViewError> {
        let mut created = 0;
        for rec in records {
            if self.apply(view, rec, now)? {
                created += 1;
            }
        }
        Ok(created)
    }

    /// Create the host's card if needed, then patch it from `rec`.
    /// Returns whether the card was created.
    pub fn apply<V: ViewHandle>(
        &mut self,
        view: &mut V,
        rec: &SnapshotRecord,
        now: f64,
    ) -> Result<bool, ViewError> {
        let key = sanitize(&rec.host);
        let created = !self.cards.contains_key(&key);
        if created {
            let ids = CardIds::new(&key);
            self.build(view, &ids)?;
            tracing::debug!(host = %rec.host, card = %ids.card, "card created");
            self.cards.insert(
                key.clone(),
                Card {
                    host: rec.host.clone(),
                    ids,
                    last_seen: rec.timestamp,
                    freshness: Freshness::Absent,
                    devices: 0,
                },
            );
            self.arrival.push(key.clone());
        }

        let face = CardFace::of(rec);
        let Some(card) = self.cards.get_mut(&key) else {
            return Ok(created);
        };
        if card.devices != face.boxes.len() {
            rebuild_gpu_row(view, card, face.boxes.len())?;
        }
        patch_face(view, &card.ids, &face)?;
        card.last_seen = rec.timestamp;
        card.host = rec.host.clone();

        self.timers.arm(key.clone(), now);
        self.refresh_age(view, &key, now)?;
        Ok(created)
    }

    /// Fire due timers: refresh time-ago text of those cards and re-evaluate
    /// freshness of every card. Returns how many timers fired.
    pub fn tick<V: ViewHandle>(&mut self, view: &mut V, now: f64) -> Result<usize, ViewError> {
        let fired = self.timers.fire_due(now);
        for key in &fired {
            self.refresh_age(view, key, now)?;
        }
        for key in self.arrival.clone() {
            self.refresh_freshness(view, &key, now)?;
        }
        Ok(fired.len())
    }

    fn build<V: ViewHandle>(&self, view: &mut V, ids: &CardIds) -> Result<(), ViewError> {
        view.create(&self.container, &ids.card, NodeKind::Card)?;
        for (id, kind) in [
            (&ids.title, NodeKind::Text),
            (&ids.cpu, NodeKind::Text),
            (&ids.cpu_bar, NodeKind::Bar),
            (&ids.mem, NodeKind::Text),
            (&ids.mem_bar, NodeKind::Bar),
            (&ids.gpu, NodeKind::Text),
            (&ids.gpu_bar, NodeKind::Bar),
            (&ids.gpu_row, NodeKind::Row),
            (&ids.ts, NodeKind::Text),
            (&ids.ago, NodeKind::Text),
        ] {
            view.create(&ids.card, id, kind)?;
        }
        Ok(())
    }

    fn refresh_age<V: ViewHandle>(
        &mut self,
        view: &mut V,
        key: &str,
        now: f64,
    ) -> Result<(), ViewError> {
        let Some(card) = self.cards.get(key) else {
            return Ok(());
        };
        view.patch(&card.ids.ago, Field::Text(time_ago_at(card.last_seen, now)))?;
        self.refresh_freshness(view, key, now)
    }

    fn refresh_freshness<V: ViewHandle>(
        &mut self,
        view: &mut V,
        key: &str,
        now: f64,
    ) -> Result<(), ViewError> {
        let Some(card) = self.cards.get_mut(key) else {
            return Ok(());
        };
        let state = Freshness::at(Some(card.last_seen), now);
        if state == card.freshness {
            return Ok(());
        }
        if state == Freshness::Stale {
            tracing::info!(host = %card.host, last_seen = card.last_seen, "host went stale");
        }
        view.patch(&card.ids.card, Field::Border(state.colour()))?;
        view.patch(&card.ids.ts, Field::Foreground(state.colour()))?;
        view.patch(&card.ids.ago, Field::Foreground(state.colour()))?;
        card.freshness = state;
        Ok(())
    }
}

fn rebuild_gpu_row<V: ViewHandle>(
    view: &mut V,
    card: &mut Card,
    devices: usize,
) -> Result<(), ViewError> {
    for child in view.locate(&card.ids.gpu_row)?.children.clone() {
        view.remove(&child)?;
    }
    for i in 0..devices {
        view.create(&card.ids.gpu_row, &card.ids.gpu_box(i), NodeKind::GpuBox)?;
    }
    if card.devices != devices {
        tracing::debug!(host = %card.host, from = card.devices, to = devices, "GPU row rebuilt");
    }
    card.devices = devices;
    Ok(())
}

fn patch_line<V: ViewHandle>(
    view: &mut V,
    text_id: &str,
    bar_id: &str,
    line: &UsageLine,
) -> Result<(), ViewError> {
    view.patch(text_id, Field::Text(line.text.clone()))?;
    view.patch(bar_id, Field::Width(line.width))?;
    view.patch(bar_id, Field::Background(line.colour))
}

fn patch_face<V: ViewHandle>(
    view: &mut V,
    ids: &CardIds,
    face: &CardFace,
) -> Result<(), ViewError> {
    view.patch(&ids.title, Field::Text(face.title.clone()))?;
    patch_line(view, &ids.cpu, &ids.cpu_bar, &face.cpu)?;
    patch_line(view, &ids.mem, &ids.mem_bar, &face.memory)?;
    patch_line(view, &ids.gpu, &ids.gpu_bar, &face.gpu)?;
    for (i, gpu) in face.boxes.iter().enumerate() {
        let id = ids.gpu_box(i);
        view.patch(&id, Field::Text(gpu.text.clone()))?;
        view.patch(&id, Field::Background(gpu.background))?;
        view.patch(&id, Field::Foreground(gpu.foreground))?;
    }
    view.patch(&ids.ts, Field::Text(face.timestamp.clone()))
}
