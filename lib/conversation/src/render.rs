//! Human-readable transcript rendering.
//!
//! The rendered log is stored content-addressed, so the output for a given
//! transcript must never change: no timestamps, no ids, `\n` endings only.

use crate::turn::Transcript;
use std::fmt::Write;

const HEADER: &str = "Conversation Log:\n";

/// Renders `transcript` as one block per round.
///
/// ```text
/// Conversation Log:
///
/// [Round 1]
/// Model 1 (smollm:360m): ...
/// Model 2 (qwen3:0.6b): ...
/// ```
#[must_use]
pub fn render(transcript: &Transcript) -> String {
    let mut out = String::from(HEADER);

    for (round, turns) in transcript.rounds().enumerate() {
        // Writing to a String cannot fail.
        let _ = write!(out, "\n[Round {}]\n", round + 1);
        for turn in turns {
            let _ = writeln!(
                out,
                "{} ({}): {}",
                turn.participant_label, turn.model, turn.output_text
            );
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::turn::tests::turn;
    use roundtable_core::SessionId;

    #[test]
    fn empty_transcript_is_header_only() {
        let t = Transcript::new(SessionId::new(), 2);
        assert_eq!(render(&t), "Conversation Log:\n");
    }

    #[test]
    fn rounds_are_blocks() {
        let mut t = Transcript::new(SessionId::new(), 2);
        t.push(turn(0, 0, "a0"));
        t.push(turn(0, 1, "b0"));
        t.push(turn(1, 0, "a1"));

        assert_eq!(
            render(&t),
            "Conversation Log:\n\
             \n[Round 1]\n\
             Model 1 (model-0): a0\n\
             Model 2 (model-1): b0\n\
             \n[Round 2]\n\
             Model 1 (model-0): a1\n"
        );
    }

    #[test]
    fn render_ignores_timestamps_and_ids() {
        let mut a = Transcript::new(SessionId::new(), 1);
        a.push(turn(0, 0, "same"));
        let mut b = Transcript::new(SessionId::new(), 1);
        b.push(turn(0, 0, "same"));

        assert_eq!(render(&a), render(&a));
        assert_eq!(render(&a), render(&b));
    }
}
