//! Text reveal adapter.
//!
//! The end text is revealed left to right. Characters not revealed yet come
//! from the start text, or are scrambled from a character set when a
//! [`ScrambleMode`] is set. The visible length moves linearly from the start
//! length to the end length.

use serde::{Deserialize, Serialize};

use super::{hash64, DefaultAdapter, EvaluationContext, MotionAdapter};

const UPPERCASE: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
const LOWERCASE: &str = "abcdefghijklmnopqrstuvwxyz";
const NUMERALS: &str = "0123456789";
const ALL: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Scrambled characters change this many times per second of motion time.
const SCRAMBLE_RATE: f64 = 30.0;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScrambleMode {
    #[default]
    None,
    Uppercase,
    Lowercase,
    Numerals,
    All,
    Custom(String),
}

impl ScrambleMode {
    fn charset(&self) -> Option<&str> {
        match self {
            ScrambleMode::None => None,
            ScrambleMode::Uppercase => Some(UPPERCASE),
            ScrambleMode::Lowercase => Some(LOWERCASE),
            ScrambleMode::Numerals => Some(NUMERALS),
            ScrambleMode::All => Some(ALL),
            ScrambleMode::Custom(chars) if chars.is_empty() => None,
            ScrambleMode::Custom(chars) => Some(chars.as_str()),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextOptions {
    pub scramble: ScrambleMode,
    pub seed: u64,
}

#[derive(Copy, Clone, Debug, Default)]
pub struct TextAdapter;

impl MotionAdapter<String, TextOptions> for TextAdapter {
    fn evaluate(
        start: &String,
        end: &String,
        options: &TextOptions,
        ctx: &EvaluationContext,
    ) -> String {
        let t = ctx.progress.clamp(0.0, 1.0);
        if t >= 1.0 {
            return end.clone();
        }

        let start_len = start.chars().count();
        let end_len = end.chars().count();
        let revealed = ((end_len as f64) * t).floor() as usize;
        let visible = (start_len as f64 + (end_len as f64 - start_len as f64) * t).round() as usize;
        let tail = visible.saturating_sub(revealed);

        let mut out = String::with_capacity(end.len().max(start.len()));
        out.extend(end.chars().take(revealed));

        match options.scramble.charset() {
            None => out.extend(start.chars().skip(revealed).take(tail)),
            Some(charset) => {
                let pool: Vec<char> = charset.chars().collect();
                let step = (ctx.time * SCRAMBLE_RATE).max(0.0) as u64;
                for i in 0..tail {
                    let pick = hash64(options.seed, (revealed + i) as u64, step) as usize % pool.len();
                    out.push(pool[pick]);
                }
            }
        }
        out
    }
}

impl DefaultAdapter for String {
    type Options = TextOptions;
    type Adapter = TextAdapter;
}
