use num_bigint::BigUint;
use serde::{Serialize, Serializer};
use std::io::{self, Write};
use std::time::Duration;

use crate::sequence::Trajectory;

/// 1 回分の実行記録
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    #[serde(rename = "starting_number", serialize_with = "serialize_decimal")]
    pub seed: BigUint,
    #[serde(rename = "processing_time_us", serialize_with = "serialize_micros")]
    pub elapsed: Duration,
    /// 1 始まりのステップ数
    pub steps: u64,
}

impl HistoryEntry {
    pub fn processing_time_us(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1e6
    }
}

fn serialize_decimal<S: Serializer>(n: &BigUint, s: S) -> Result<S::Ok, S::Error> {
    s.collect_str(n)
}

fn serialize_micros<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1e6)
}

/// 呼び出し側が所有する追記専用の実行履歴。
/// セッションごとに 1 つ持ち、プロセス全体で共有しない。
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

pub const TABLE_COLUMNS: [&str; 3] = ["Starting Number", "Processing time (us)", "# Steps"];

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// 軌道の統計を追記し、追加したエントリを返す
    pub fn record(&mut self, trajectory: &Trajectory) -> &HistoryEntry {
        self.entries.push(HistoryEntry {
            seed: trajectory.seed.value().clone(),
            elapsed: trajectory.elapsed,
            steps: trajectory.reported_steps(),
        });
        let last = self.entries.len() - 1;
        &self.entries[last]
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, HistoryEntry> {
        self.entries.iter()
    }

    /// 表の 1 行分の文字列（時間は小数 2 桁）
    pub fn row_strings(entry: &HistoryEntry) -> [String; 3] {
        [
            entry.seed.to_string(),
            format!("{:.2}", entry.processing_time_us()),
            entry.steps.to_string(),
        ]
    }

    pub fn write_csv(&self, mut w: impl Write) -> io::Result<()> {
        writeln!(w, "{}", TABLE_COLUMNS.join(","))?;
        for entry in &self.entries {
            writeln!(w, "{}", Self::row_strings(entry).join(","))?;
        }
        w.flush()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// 端末表示用の中央揃えテーブル
    pub fn render_table(&self) -> String {
        let rows: Vec<[String; 3]> = self.entries.iter().map(Self::row_strings).collect();
        let mut widths = TABLE_COLUMNS.map(str::len);
        for row in &rows {
            for (w, cell) in widths.iter_mut().zip(row.iter()) {
                *w = (*w).max(cell.len());
            }
        }

        let line = |cells: [&str; 3]| -> String {
            let parts: Vec<String> = cells.iter().zip(widths.iter())
                .map(|(c, &w)| format!("{:^w$}", c, w = w))
                .collect();
            format!("| {} |", parts.join(" | "))
        };
        let rule = format!("+{}+", widths.iter().map(|&w| "-".repeat(w + 2)).collect::<Vec<_>>().join("+"));

        let mut out = String::new();
        out.push_str(&rule);
        out.push('\n');
        out.push_str(&line(TABLE_COLUMNS));
        out.push('\n');
        out.push_str(&rule);
        out.push('\n');
        for row in &rows {
            out.push_str(&line([row[0].as_str(), row[1].as_str(), row[2].as_str()]));
            out.push('\n');
        }
        out.push_str(&rule);
        out
    }
}

impl<'a> IntoIterator for &'a History {
    type Item = &'a HistoryEntry;
    type IntoIter = std::slice::Iter<'a, HistoryEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
