//! Row building and viewport arithmetic shared by the renderer and the
//! interaction loop. Heights must always come from `row_height`.

use crate::render_highlight::fragment_height;
use crate::types::{RepoGroup, Row};

/// Terminal lines a row occupies when drawn.
pub fn row_height(groups: &[RepoGroup], row: &Row) -> usize {
    match row {
        // blank separator + label
        Row::Section { .. } => 2,
        Row::Repo { .. } => 1,
        Row::Extract { repo, extract } => {
            let fragment = groups
                .get(*repo)
                .and_then(|g| g.matches.get(*extract))
                .and_then(|m| m.text_matches.first());
            1 + fragment.map_or(0, |tm| fragment_height(&tm.fragment))
        }
    }
}

/// Flatten groups into rows, applying an optional case-insensitive path
/// filter. Groups without any matching path are skipped along with their
/// section header; folded groups never contribute extract rows.
pub fn build_rows(groups: &[RepoGroup], filter: &str) -> Vec<Row> {
    let filter = filter.to_lowercase();
    let mut rows = Vec::new();

    for (ri, group) in groups.iter().enumerate() {
        let visible: Vec<usize> = group
            .matches
            .iter()
            .enumerate()
            .filter(|(_, m)| m.path_matches(&filter))
            .map(|(i, _)| i)
            .collect();
        if !filter.is_empty() && visible.is_empty() {
            continue;
        }

        if let Some(label) = &group.section_label {
            rows.push(Row::Section {
                label: label.clone(),
            });
        }
        rows.push(Row::Repo { repo: ri });
        if !group.folded {
            rows.extend(visible.into_iter().map(|ei| Row::Extract {
                repo: ri,
                extract: ei,
            }));
        }
    }
    rows
}

/// Exclusive end index of the rows drawn from `scroll_offset` within
/// `viewport` lines. The first row is always drawn even if it overflows;
/// after that a row is drawn only if it fits entirely.
pub fn visible_end(
    rows: &[Row],
    groups: &[RepoGroup],
    scroll_offset: usize,
    viewport: usize,
) -> usize {
    let mut used = 0;
    let mut end = scroll_offset.min(rows.len());
    for (i, row) in rows.iter().enumerate().skip(scroll_offset) {
        let h = row_height(groups, row);
        if used > 0 && used + h > viewport {
            break;
        }
        used += h;
        end = i + 1;
        if used >= viewport {
            break;
        }
    }
    end
}

/// Whether the cursor row is drawn in full at the current scroll offset.
///
/// Uses the same full-fit rule as `visible_end`, so a visible cursor is
/// always one of the rows the renderer draws.
pub fn is_cursor_visible(
    rows: &[Row],
    groups: &[RepoGroup],
    cursor: usize,
    scroll_offset: usize,
    viewport: usize,
) -> bool {
    cursor >= scroll_offset && cursor < visible_end(rows, groups, scroll_offset, viewport)
}

/// Row index of the repo header owning `repo`, if it is in `rows`.
pub fn repo_row_index(rows: &[Row], repo: usize) -> Option<usize> {
    rows.iter()
        .position(|r| matches!(r, Row::Repo { repo: ri } if *ri == repo))
}

// ── Cursor helpers ──────────────────────────────────────────

/// Nearest selectable (non-section) row at or after `from`.
fn selectable_at_or_after(rows: &[Row], from: usize) -> Option<usize> {
    (from..rows.len()).find(|&i| !rows[i].is_section())
}

/// Nearest selectable row at or before `from`.
fn selectable_at_or_before(rows: &[Row], from: usize) -> Option<usize> {
    (0..=from.min(rows.len().saturating_sub(1)))
        .rev()
        .find(|&i| i < rows.len() && !rows[i].is_section())
}

/// Clamp a cursor into `rows` and off section headers.
pub fn clamp_cursor(rows: &[Row], cursor: usize) -> usize {
    if rows.is_empty() {
        return 0;
    }
    let cursor = cursor.min(rows.len() - 1);
    selectable_at_or_after(rows, cursor)
        .or_else(|| selectable_at_or_before(rows, cursor))
        .unwrap_or(cursor)
}

/// Previous selectable row, or the cursor itself at the top.
pub fn step_up(rows: &[Row], cursor: usize) -> usize {
    if cursor == 0 {
        return clamp_cursor(rows, 0);
    }
    selectable_at_or_before(rows, cursor - 1).unwrap_or(cursor)
}

/// Next selectable row, or the cursor itself at the bottom.
pub fn step_down(rows: &[Row], cursor: usize) -> usize {
    selectable_at_or_after(rows, cursor + 1).unwrap_or_else(|| clamp_cursor(rows, cursor))
}
