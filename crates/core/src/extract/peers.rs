//! Seeder/leecher roster parsing.
//!
//! Peer pages across NexusPHP skins share a loose shape: one table per
//! roster, a header row naming the columns in one of several languages,
//! then one row per peer. Everything here degrades instead of failing:
//! an unrecognized document yields empty rosters, an unreadable row
//! yields a placeholder record (or is skipped, per configuration).

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::config::MalformedRowMode;

use super::PeerRecord;

static TABLE: Lazy<Selector> = Lazy::new(|| Selector::parse("table").expect("valid selector"));
static ROW: Lazy<Selector> = Lazy::new(|| Selector::parse("tr").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));
static BODY: Lazy<Selector> = Lazy::new(|| Selector::parse("body").expect("valid selector"));

/// Column positions within a roster table.
///
/// The defaults fit the stock NexusPHP peer list; a header row with
/// recognized captions overrides them.
struct ColumnMap {
    name: usize,
    connectable: usize,
    uploaded: usize,
    downloaded: usize,
    completed: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            name: 0,
            connectable: 1,
            uploaded: 2,
            downloaded: 4,
            completed: 7,
        }
    }
}

impl ColumnMap {
    /// Header captions are matched case-sensitively; simplified and
    /// traditional Chinese variants are both in circulation.
    fn apply_header(&mut self, cells: &[String]) {
        for (index, text) in cells.iter().enumerate() {
            match text.as_str() {
                "用户" | "用戶" | "会员/IP" => self.name = index,
                "可连接" | "可連接" | "公网" => self.connectable = index,
                "上传" | "上傳" | "总上传" => self.uploaded = index,
                "下载" | "下載" | "本次下载" => self.downloaded = index,
                "完成" => self.completed = index,
                _ => {}
            }
        }
    }
}

/// Split a peer page into its seeder and leecher rosters.
///
/// The first two tables in document order are seeders then leechers.
/// A page with a single table is only read when the body has exactly
/// three child nodes: a table in second position is the seeder roster,
/// otherwise the third node is read as the leecher roster. Anything
/// else yields two empty rosters.
pub fn parse_peer_list(body: &str, mode: MalformedRowMode) -> (Vec<PeerRecord>, Vec<PeerRecord>) {
    let flat = body.replace('\n', "");
    let document = Html::parse_document(&flat);

    let tables: Vec<ElementRef> = document.select(&TABLE).take(2).collect();
    match tables.len() {
        2 => (parse_table(tables[0], mode), parse_table(tables[1], mode)),
        1 => parse_single_table_page(&document, mode),
        _ => (Vec::new(), Vec::new()),
    }
}

fn parse_single_table_page(
    document: &Html,
    mode: MalformedRowMode,
) -> (Vec<PeerRecord>, Vec<PeerRecord>) {
    let Some(body) = document.select(&BODY).next() else {
        return (Vec::new(), Vec::new());
    };
    let children: Vec<_> = body.children().collect();
    if children.len() != 3 {
        return (Vec::new(), Vec::new());
    }
    let table_at = |index: usize| {
        children
            .get(index)
            .copied()
            .and_then(ElementRef::wrap)
            .filter(|el| el.value().name() == "table")
    };
    if let Some(table) = table_at(1) {
        (parse_table(table, mode), Vec::new())
    } else if let Some(table) = table_at(2) {
        (Vec::new(), parse_table(table, mode))
    } else {
        (Vec::new(), Vec::new())
    }
}

fn parse_table(table: ElementRef, mode: MalformedRowMode) -> Vec<PeerRecord> {
    let mut columns = ColumnMap::default();
    let mut peers = Vec::new();
    for (index, row) in table.select(&ROW).enumerate() {
        let cells: Vec<String> = row.select(&CELL).map(|cell| cell.text().collect()).collect();
        if index == 0 {
            columns.apply_header(&cells);
            continue;
        }
        match parse_row(&cells, &columns) {
            Some(peer) => peers.push(peer),
            None => match mode {
                MalformedRowMode::Placeholder => peers.push(PeerRecord::placeholder()),
                MalformedRowMode::Skip => {}
            },
        }
    }
    peers
}

fn parse_row(cells: &[String], columns: &ColumnMap) -> Option<PeerRecord> {
    let name = cells.get(columns.name)?.clone();
    // The connectable flag reads inverted: a "是" cell parses as false.
    let connectable = cells.get(columns.connectable)?.as_str() != "是";
    let uploaded = cells.get(columns.uploaded)?.clone();
    let downloaded = cells.get(columns.downloaded)?.clone();
    let percent: f32 = cells
        .get(columns.completed)?
        .trim()
        .trim_matches('%')
        .trim()
        .parse()
        .ok()?;
    Some(PeerRecord {
        name,
        connectable,
        uploaded,
        downloaded,
        completed: (percent / 100.0).clamp(0.0, 1.0),
    })
}
