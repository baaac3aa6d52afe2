//! Frame sequence description: base path, frame count, playback direction.
//!
//! Frame numbers are 1-indexed and always lie in `[1, total_frames]`.
//! The direction decides which end of the sequence is shown first and
//! therefore in which order frames are worth loading.

use log::warn;
use serde::{Deserialize, Serialize};

/// Playback direction of a sequence relative to scroll progress.
///
/// - `Forward`: progress 0 shows frame 1, progress 1 shows the last frame
/// - `Reverse`: progress 0 shows the last frame, progress 1 shows frame 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FrameDirection {
    #[default]
    Forward,
    Reverse,
}

impl FrameDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameDirection::Forward => "forward",
            FrameDirection::Reverse => "reverse",
        }
    }
}

impl std::fmt::Display for FrameDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FrameDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "fwd" => Ok(FrameDirection::Forward),
            "reverse" | "rev" => Ok(FrameDirection::Reverse),
            other => Err(format!("unknown frame direction: {}", other)),
        }
    }
}

/// Ordered set of still images played back as one motion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    base_path: String,
    total_frames: u32,
    direction: FrameDirection,
}

impl FrameSequence {
    /// Create a sequence. A zero frame count is raised to 1 so that the
    /// 1-indexed frame range is never empty.
    pub fn new(base_path: impl Into<String>, total_frames: u32, direction: FrameDirection) -> Self {
        let base_path = base_path.into();
        let total_frames = if total_frames == 0 {
            warn!("Sequence {} has no frames, using 1", base_path);
            1
        } else {
            total_frames
        };
        Self {
            base_path,
            total_frames,
            direction,
        }
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn total_frames(&self) -> u32 {
        self.total_frames
    }

    pub fn direction(&self) -> FrameDirection {
        self.direction
    }

    pub fn contains(&self, frame: u32) -> bool {
        (1..=self.total_frames).contains(&frame)
    }

    /// Frame shown at progress 0.
    pub fn first_visible_frame(&self) -> u32 {
        match self.direction {
            FrameDirection::Forward => 1,
            FrameDirection::Reverse => self.total_frames,
        }
    }

    /// All frame numbers, starting from the first visible one.
    pub fn load_order(&self) -> Vec<u32> {
        match self.direction {
            FrameDirection::Forward => (1..=self.total_frames).collect(),
            FrameDirection::Reverse => (1..=self.total_frames).rev().collect(),
        }
    }

    /// Load order split into consecutive batches of at most `width` frames.
    pub fn batches(&self, width: usize) -> Vec<Vec<u32>> {
        self.load_order()
            .chunks(width.max(1))
            .map(|chunk| chunk.to_vec())
            .collect()
    }

    /// Table slot of a frame number (frame 1 lives at index 0).
    pub fn slot(&self, frame: u32) -> Option<usize> {
        self.contains(frame).then(|| (frame - 1) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_visible_frame() {
        let fwd = FrameSequence::new("/images/chocolate", 191, FrameDirection::Forward);
        let rev = FrameSequence::new("/images/mango", 191, FrameDirection::Reverse);
        assert_eq!(fwd.first_visible_frame(), 1);
        assert_eq!(rev.first_visible_frame(), 191);
    }

    #[test]
    fn test_zero_frames_raised_to_one() {
        let seq = FrameSequence::new("/images/empty", 0, FrameDirection::Reverse);
        assert_eq!(seq.total_frames(), 1);
        assert_eq!(seq.first_visible_frame(), 1);
        assert_eq!(seq.load_order(), vec![1]);
    }

    #[test]
    fn test_reverse_batches_descend() {
        let seq = FrameSequence::new("/images/mango", 23, FrameDirection::Reverse);
        let batches = seq.batches(10);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].first(), Some(&23));
        assert_eq!(batches[0].last(), Some(&14));
        assert_eq!(batches[2], vec![3, 2, 1]);
    }

    #[test]
    fn test_forward_batches_cover_all_frames() {
        let seq = FrameSequence::new("/images/chocolate", 191, FrameDirection::Forward);
        let flat: Vec<u32> = seq.batches(10).into_iter().flatten().collect();
        assert_eq!(flat, (1..=191).collect::<Vec<_>>());
    }

    #[test]
    fn test_slot_bounds() {
        let seq = FrameSequence::new("/images/x", 5, FrameDirection::Forward);
        assert_eq!(seq.slot(0), None);
        assert_eq!(seq.slot(1), Some(0));
        assert_eq!(seq.slot(5), Some(4));
        assert_eq!(seq.slot(6), None);
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("Reverse".parse::<FrameDirection>(), Ok(FrameDirection::Reverse));
        assert_eq!("forward".parse::<FrameDirection>(), Ok(FrameDirection::Forward));
        assert!("sideways".parse::<FrameDirection>().is_err());
    }
}
