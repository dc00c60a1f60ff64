//! Effect descriptions and the fixed effects chain they dispatch to.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{Error, HostError};
use crate::host::{AudioContext, AudioParam, Endpoint, FilterKind, NodeId, NodeKind, ParamChange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EffectKind {
    Reverb,
    Delay,
    #[serde(rename = "EQ")]
    Eq,
    Compressor,
    Distortion,
}

impl EffectKind {
    pub const ALL: [EffectKind; 5] = [
        EffectKind::Reverb,
        EffectKind::Delay,
        EffectKind::Eq,
        EffectKind::Compressor,
        EffectKind::Distortion,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EffectKind::Reverb => "reverb",
            EffectKind::Delay => "delay",
            EffectKind::Eq => "eq",
            EffectKind::Compressor => "compressor",
            EffectKind::Distortion => "distortion",
        }
    }
}

impl fmt::Display for EffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EffectKind {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        EffectKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::UnknownEffect(name.to_string()))
    }
}

/// A requested effect setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub kind: EffectKind,
    pub enabled: bool,
    #[serde(default)]
    pub parameters: HashMap<String, f64>,
}

impl Effect {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            enabled: true,
            parameters: HashMap::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: f64) -> Self {
        self.parameters.insert(name.into(), value);
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Stages of the chain, in signal order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Stage {
    EqLow,
    EqMid,
    EqHigh,
    Compressor,
    Delay,
    Reverb,
}

/// One resolved parameter write.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ParamTarget {
    pub stage: Stage,
    pub param: AudioParam,
    pub value: f64,
}

/// Node ids of the built chain: low/mid/high EQ, compressor, delay, reverb.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EffectsChain {
    eq_low: NodeId,
    eq_mid: NodeId,
    eq_high: NodeId,
    compressor: NodeId,
    delay: NodeId,
    reverb: NodeId,
}

impl EffectsChain {
    /// Creates and wires the stages. Returns `(chain, input, output)`.
    pub fn build<C: AudioContext>(context: &C) -> Result<(Self, NodeId, NodeId), HostError> {
        let chain = Self {
            eq_low: context.create_node(NodeKind::Filter(FilterKind::LowShelf))?,
            eq_mid: context.create_node(NodeKind::Filter(FilterKind::Peaking))?,
            eq_high: context.create_node(NodeKind::Filter(FilterKind::HighShelf))?,
            compressor: context.create_node(NodeKind::Compressor)?,
            delay: context.create_node(NodeKind::Delay)?,
            reverb: context.create_node(NodeKind::Convolver)?,
        };

        let at = context.current_time();
        for (node, frequency) in [
            (chain.eq_low, 320.0),
            (chain.eq_mid, 1000.0),
            (chain.eq_high, 3200.0),
        ] {
            context.schedule_param(node, AudioParam::Frequency, ParamChange::immediate(frequency, at))?;
        }

        let stages = chain.nodes();
        for pair in stages.windows(2) {
            context.connect(pair[0], Endpoint::Node(pair[1]))?;
        }
        let (input, output) = (chain.eq_low, chain.reverb);
        Ok((chain, input, output))
    }

    fn nodes(&self) -> SmallVec<[NodeId; 6]> {
        SmallVec::from_buf([
            self.eq_low,
            self.eq_mid,
            self.eq_high,
            self.compressor,
            self.delay,
            self.reverb,
        ])
    }

    pub fn node(&self, stage: Stage) -> NodeId {
        match stage {
            Stage::EqLow => self.eq_low,
            Stage::EqMid => self.eq_mid,
            Stage::EqHigh => self.eq_high,
            Stage::Compressor => self.compressor,
            Stage::Delay => self.delay,
            Stage::Reverb => self.reverb,
        }
    }
}

/// Maps a parameter name of `kind` to its stage and automation target.
fn param_target(kind: EffectKind, name: &str) -> Option<(Stage, AudioParam)> {
    let target = match (kind, name) {
        (EffectKind::Eq, "low") => (Stage::EqLow, AudioParam::Gain),
        (EffectKind::Eq, "mid") => (Stage::EqMid, AudioParam::Gain),
        (EffectKind::Eq, "high") => (Stage::EqHigh, AudioParam::Gain),
        (EffectKind::Compressor, "threshold") => (Stage::Compressor, AudioParam::Threshold),
        (EffectKind::Compressor, "knee") => (Stage::Compressor, AudioParam::Knee),
        (EffectKind::Compressor, "ratio") => (Stage::Compressor, AudioParam::Ratio),
        (EffectKind::Compressor, "attack") => (Stage::Compressor, AudioParam::Attack),
        (EffectKind::Compressor, "release") => (Stage::Compressor, AudioParam::Release),
        (EffectKind::Delay, "time") => (Stage::Delay, AudioParam::DelayTime),
        (EffectKind::Delay, "feedback") => (Stage::Delay, AudioParam::Feedback),
        (EffectKind::Reverb, "mix") => (Stage::Reverb, AudioParam::Mix),
        (EffectKind::Reverb, "decay") => (Stage::Reverb, AudioParam::Decay),
        _ => return None,
    };
    Some(target)
}

/// Values that make a stage transparent, used when an effect is disabled.
fn bypass_targets(kind: EffectKind) -> &'static [(Stage, AudioParam, f64)] {
    match kind {
        EffectKind::Eq => &[
            (Stage::EqLow, AudioParam::Gain, 0.0),
            (Stage::EqMid, AudioParam::Gain, 0.0),
            (Stage::EqHigh, AudioParam::Gain, 0.0),
        ],
        EffectKind::Compressor => &[(Stage::Compressor, AudioParam::Ratio, 1.0)],
        EffectKind::Delay => &[
            (Stage::Delay, AudioParam::DelayTime, 0.0),
            (Stage::Delay, AudioParam::Feedback, 0.0),
        ],
        EffectKind::Reverb => &[(Stage::Reverb, AudioParam::Mix, 0.0)],
        EffectKind::Distortion => &[],
    }
}

/// Whether the chain has a stage for `kind`.
pub(crate) fn has_stage(kind: EffectKind) -> bool {
    !matches!(kind, EffectKind::Distortion)
}

/// Resolves `effect` into parameter writes. Unknown parameter names are
/// logged and skipped.
pub(crate) fn resolve(effect: &Effect) -> SmallVec<[ParamTarget; 6]> {
    if !effect.enabled {
        return bypass_targets(effect.kind)
            .iter()
            .map(|&(stage, param, value)| ParamTarget { stage, param, value })
            .collect();
    }

    let mut names: SmallVec<[&String; 6]> = effect.parameters.keys().collect();
    names.sort();

    let mut targets = SmallVec::new();
    for name in names {
        let value = effect.parameters[name];
        match param_target(effect.kind, name) {
            Some(_) if !value.is_finite() => {
                tracing::warn!(effect = %effect.kind, param = %name, "Skipping non-finite effect parameter");
            }
            Some((stage, param)) => targets.push(ParamTarget { stage, param, value }),
            None => {
                tracing::warn!(effect = %effect.kind, param = %name, "Unknown effect parameter, skipped");
            }
        }
    }
    targets
}
