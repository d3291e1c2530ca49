use super::LanguageRows;

/// Terminal status written in place of the transient ones.
pub const STATUS_DONE: &str = "완료";

/// Statuses recoded to `STATUS_DONE` after a merge.
pub const STATUS_TO_COMPLETE: [&str; 2] = ["번역필요", "수정"];

/// Rewrite transient statuses to done on every row of every language.
/// Returns how many cells changed; a second pass always returns 0.
pub fn apply_status_completion(rows: &mut LanguageRows) -> usize {
    let mut changed = 0;
    for row in rows.values_mut().flatten() {
        if STATUS_TO_COMPLETE.contains(&row.status.as_str()) {
            row.status = STATUS_DONE.to_string();
            changed += 1;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use crate::merge::Row;

    fn status_row(status: &str) -> Row {
        Row {
            key: "K".to_string(),
            status: status.to_string(),
            ..Row::default()
        }
    }

    #[test]
    fn test_recodes_only_transient_statuses() {
        let mut rows = LanguageRows::new();
        rows.insert(
            Language::En,
            vec![
                status_row("번역필요"),
                status_row("수정"),
                status_row("검수중"),
                status_row(""),
                status_row("완료"),
            ],
        );
        rows.insert(Language::Ja, vec![status_row("수정")]);

        assert_eq!(apply_status_completion(&mut rows), 3);
        let statuses: Vec<&str> = rows[&Language::En].iter().map(|r| r.status.as_str()).collect();
        assert_eq!(statuses, vec!["완료", "완료", "검수중", "", "완료"]);
        assert_eq!(rows[&Language::Ja][0].status, "완료");
    }

    #[test]
    fn test_idempotent() {
        let mut rows = LanguageRows::new();
        rows.insert(Language::Ct, vec![status_row("번역필요"), status_row("신규")]);
        apply_status_completion(&mut rows);
        let once = rows.clone();
        assert_eq!(apply_status_completion(&mut rows), 0);
        assert_eq!(rows, once);
    }
}
