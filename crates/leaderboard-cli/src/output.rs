use serde::Serialize;

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    println!("{}", json);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
}

/// Plain-text table. Rank, level and count columns are right-aligned so
/// their digits line up.
pub struct Table {
    headers: Vec<&'static str>,
    align: Vec<Align>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: &[&'static str]) -> Self {
        Self {
            headers: headers.to_vec(),
            align: vec![Align::Left; headers.len()],
            rows: Vec::new(),
        }
    }

    /// Right-align the named columns.
    pub fn numeric(mut self, headers: &[&str]) -> Self {
        for (i, h) in self.headers.iter().enumerate() {
            if headers.contains(h) {
                self.align[i] = Align::Right;
            }
        }
        self
    }

    pub fn rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn render(&self) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut out = String::new();
        out.push_str(&line(self.headers.iter().copied(), &widths, &self.align));
        out.push('\n');
        let rule: Vec<String> = widths.iter().map(|&w| "-".repeat(w)).collect();
        out.push_str(&rule.join("  "));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(row.iter().map(String::as_str), &widths, &self.align));
            out.push('\n');
        }
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }
}

fn line<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize], align: &[Align]) -> String {
    let padded: Vec<String> = cells
        .zip(widths.iter().zip(align))
        .map(|(cell, (&w, align))| match align {
            Align::Left => format!("{cell:<w$}"),
            Align::Right => format!("{cell:>w$}"),
        })
        .collect();
    padded.join("  ").trim_end().to_string()
}

/// `13034431` as `13,034,431`.
pub fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_columns_align_right() {
        let table = Table::new(&["#", "NAME", "RANK"])
            .numeric(&["#", "RANK"])
            .rows(vec![
                vec!["1".into(), "Lynx Titan".into(), "3".into()],
                vec!["10".into(), "Zezima".into(), "12,000".into()],
            ]);
        assert_eq!(
            table.render(),
            " #  NAME          RANK\n\
             --  ----------  ------\n \
             1  Lynx Titan       3\n\
             10  Zezima      12,000\n"
        );
    }

    #[test]
    fn trailing_padding_is_trimmed() {
        let table = Table::new(&["KIND", "NAME"]).rows(vec![vec!["skill".into(), String::new()]]);
        let rendered = table.render();
        assert!(rendered.lines().all(|l| !l.ends_with(' ')));
    }

    #[test]
    fn thousands_groups_digits() {
        assert_eq!(thousands(0), "0");
        assert_eq!(thousands(999), "999");
        assert_eq!(thousands(13_034_431), "13,034,431");
        assert_eq!(thousands(-1_000), "-1,000");
    }
}
