use std::io::{BufRead, Write};
use tracing::debug;

use crate::error::Result;
use crate::history::History;
use crate::report::format_big;
use crate::sequence::{run_sequence, SequenceOptions};
use crate::validate::{CoercionPolicy, RawValue, Seed};

pub const PROMPT: &str = "Enter an integer number: ";

/// 対話モードの 1 セッション。履歴はセッションが所有する。
#[derive(Debug)]
pub struct InteractiveSession {
    policy: CoercionPolicy,
    options: SequenceOptions,
    history: History,
}

impl InteractiveSession {
    pub fn new(policy: CoercionPolicy, options: SequenceOptions) -> Self {
        InteractiveSession { policy, options, history: History::new() }
    }

    /// 空行・"q"・"quit"・EOF で終了する。
    /// 不正な入力は err に書いて次の入力へ進む。
    pub fn run(&mut self, input: impl BufRead, mut out: impl Write, mut err: impl Write) -> Result<()> {
        let mut lines = input.lines();
        loop {
            write!(out, "{}", PROMPT)?;
            out.flush()?;

            let Some(line) = lines.next() else { break };
            let line = line?;
            let input = line.trim();
            if is_quit(input) {
                break;
            }

            if let Err(e) = self.handle(input, &mut out) {
                writeln!(err, "{}", e)?;
            }
        }
        debug!(runs = self.history.len(), "session ended");
        Ok(())
    }

    fn handle(&mut self, input: &str, out: &mut impl Write) -> Result<()> {
        let seed = Seed::from_raw(&RawValue::from(input), self.policy)?;
        let trajectory = run_sequence(&seed, &self.options)?;

        writeln!(out, "Starting number: {}", format_big(seed.value()))?;
        writeln!(out)?;
        for value in &trajectory.values {
            writeln!(out, "{}", format_big(value))?;
        }
        let entry = self.history.record(&trajectory);
        writeln!(out, "Steps: {}", entry.steps)?;
        writeln!(out, "Processing time: {:.2} us", entry.processing_time_us())?;
        writeln!(out)?;
        writeln!(out, "{}", self.history.render_table())?;
        writeln!(out)?;
        Ok(())
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn into_history(self) -> History {
        self.history
    }
}

fn is_quit(input: &str) -> bool {
    input.is_empty() || input.eq_ignore_ascii_case("q") || input.eq_ignore_ascii_case("quit")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(script: &str) -> (InteractiveSession, String, String) {
        let mut session = InteractiveSession::new(CoercionPolicy::Lenient, SequenceOptions::default());
        let mut out = Vec::new();
        let mut err = Vec::new();
        session.run(script.as_bytes(), &mut out, &mut err).unwrap();
        (session, String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
    }

    #[test]
    fn test_errors_continue_and_q_ends() {
        let (session, out, err) = run("6\n5.5\n0\nq\n7\n");
        // q の後の 7 は読まれない
        assert_eq!(session.history().len(), 1);
        assert_eq!(out.matches(PROMPT).count(), 4);
        assert!(out.contains("Starting number: 6\n"));
        assert!(out.contains("Steps: 9\n"));
        assert!(err.contains("ERROR: 5.5 is not an integer.\n"));
        assert!(err.contains("ERROR: 0 is out of domain"));
        assert_eq!(err.lines().count(), 2);
    }

    #[test]
    fn test_values_printed_without_seed() {
        let (_, out, _) = run("6\n");
        let body: Vec<&str> = out
            .lines()
            .skip_while(|l| l.is_empty() || l.starts_with("Enter"))
            .take(8)
            .collect();
        assert_eq!(body, vec!["3", "10", "5", "16", "8", "4", "2", "1"]);
    }

    #[test]
    fn test_table_after_each_run() {
        let (session, out, _) = run("6\n27\n");
        assert_eq!(session.history().len(), 2);
        assert_eq!(out.matches("| Starting Number |").count(), 2);
        // 2 回目の表には両方の行がある
        let last_table = &out[out.rfind("| Starting Number |").unwrap()..];
        let rows: Vec<(&str, &str)> = last_table
            .lines()
            .filter(|l| l.starts_with('|'))
            .map(|l| {
                let cells: Vec<&str> = l.split('|').map(str::trim).collect();
                (cells[1], cells[3])
            })
            .collect();
        assert_eq!(rows, vec![("Starting Number", "# Steps"), ("6", "9"), ("27", "112")]);
    }

    #[test]
    fn test_empty_line_and_eof_end() {
        let (session, _, _) = run("6\n\n7\n");
        assert_eq!(session.history().len(), 1);

        // 改行なしの最終行も読んでから EOF で終わる
        let (session, out, _) = run("27");
        assert_eq!(session.into_history().iter().map(|e| e.steps).collect::<Vec<_>>(), vec![112]);
        assert_eq!(out.matches(PROMPT).count(), 2);
    }

    #[test]
    fn test_quit_is_case_insensitive() {
        let (session, _, _) = run("QUIT\n6\n");
        assert!(session.history().is_empty());
    }

    #[test]
    fn test_iteration_limit_reported() {
        let mut session = InteractiveSession::new(CoercionPolicy::Lenient, SequenceOptions::with_limit(10));
        let mut out = Vec::new();
        let mut err = Vec::new();
        session.run("27\n6\n".as_bytes(), &mut out, &mut err).unwrap();
        let err = String::from_utf8(err).unwrap();
        assert_eq!(err, "ERROR: seed 27 did not reach 1 within 10 steps.\n");
        assert_eq!(session.history().len(), 1);
    }
}
