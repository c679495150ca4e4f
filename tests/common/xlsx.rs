// tests/common/xlsx.rs
// Reads a written workbook back: sheet names, cell values and cell fills.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;
use std::io::{Cursor, Read};

/// One written cell. Shared strings are resolved; `fill` is `RRGGBB`.
#[derive(Debug, Clone, PartialEq)]
pub struct CellOut {
    pub value: String,
    pub fill: Option<String>,
}

/// One sheet, keyed by 1-based row number; cells in column order.
pub type SheetOut = BTreeMap<u32, Vec<CellOut>>;

pub struct WorkbookOut {
    pub sheet_names: Vec<String>,
    sheets: Vec<SheetOut>,
}

impl WorkbookOut {
    pub fn read(bytes: &[u8]) -> Self {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).expect("xlsx is a zip");
        let mut part = |name: &str| {
            let mut s = String::new();
            zip.by_name(name)
                .unwrap_or_else(|e| panic!("{name}: {e}"))
                .read_to_string(&mut s)
                .unwrap();
            s
        };
        let sheet_names = sheet_names(&part("xl/workbook.xml"));
        let fills = style_fills(&part("xl/styles.xml"));
        let strings = shared_strings(&part("xl/sharedStrings.xml"));
        let sheets = (1..=sheet_names.len())
            .map(|i| sheet(&part(&format!("xl/worksheets/sheet{i}.xml")), &fills, &strings))
            .collect();
        Self {
            sheet_names,
            sheets,
        }
    }

    pub fn from_path(path: &std::path::Path) -> Self {
        Self::read(&std::fs::read(path).unwrap())
    }

    pub fn sheet(&self, name: &str) -> &SheetOut {
        let i = self
            .sheet_names
            .iter()
            .position(|n| n == name)
            .unwrap_or_else(|| panic!("no sheet {name}"));
        &self.sheets[i]
    }
}

/// Cell values of one row.
pub fn values(sheet: &SheetOut, row: u32) -> Vec<&str> {
    sheet[&row].iter().map(|c| c.value.as_str()).collect()
}

fn attr(e: &BytesStart, key: &str) -> Option<String> {
    e.try_get_attribute(key)
        .unwrap()
        .map(|a| a.unescape_value().unwrap().into_owned())
}

fn sheet_names(workbook: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut r = Reader::from_str(workbook);
    loop {
        match r.read_event().unwrap() {
            Event::Start(e) | Event::Empty(e) if e.name().as_ref() == b"sheet" => {
                out.extend(attr(&e, "name"));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    out
}

/// Fill colour of every `cellXfs` entry, indexed by the cell style id.
fn style_fills(styles: &str) -> Vec<Option<String>> {
    let mut fills: Vec<Option<String>> = Vec::new();
    let mut xf_fill_ids: Vec<usize> = Vec::new();
    let (mut in_fill, mut in_cell_xfs) = (false, false);
    let mut r = Reader::from_str(styles);
    loop {
        match r.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == b"fill" => {
                fills.push(None);
                in_fill = true;
            }
            Event::End(e) if e.name().as_ref() == b"fill" => in_fill = false,
            Event::Start(e) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = true,
            Event::End(e) if e.name().as_ref() == b"cellXfs" => in_cell_xfs = false,
            Event::Start(e) | Event::Empty(e) => {
                let name = e.name();
                let name = name.as_ref();
                if in_fill && (name == b"fgColor" || name == b"bgColor") {
                    if let (Some(slot), Some(rgb)) = (fills.last_mut(), attr(&e, "rgb")) {
                        slot.get_or_insert(rgb);
                    }
                } else if in_cell_xfs && name == b"xf" {
                    let id = attr(&e, "fillId").and_then(|v| v.parse().ok()).unwrap_or(0);
                    xf_fill_ids.push(id);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    xf_fill_ids
        .into_iter()
        .map(|id| {
            fills
                .get(id)
                .cloned()
                .flatten()
                .map(|argb| argb[argb.len().saturating_sub(6)..].to_ascii_uppercase())
        })
        .collect()
}

fn shared_strings(xml: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut in_t = false;
    let mut r = Reader::from_str(xml);
    loop {
        match r.read_event().unwrap() {
            Event::Start(e) if e.name().as_ref() == b"si" => out.push(String::new()),
            Event::Start(e) if e.name().as_ref() == b"t" => in_t = true,
            Event::End(e) if e.name().as_ref() == b"t" => in_t = false,
            Event::Text(t) if in_t => {
                if let Some(s) = out.last_mut() {
                    s.push_str(&t.unescape().unwrap());
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    out
}

fn sheet(xml: &str, fills: &[Option<String>], strings: &[String]) -> SheetOut {
    let mut rows = SheetOut::new();
    // (row, style, shared) of the open `<c>`
    let mut open: Option<(u32, usize, bool)> = None;
    let mut value = String::new();
    let mut in_v = false;

    let cell_of = |e: &BytesStart| {
        let r = attr(e, "r").expect("cell reference");
        let row: u32 = r
            .trim_start_matches(|c: char| c.is_ascii_alphabetic())
            .parse()
            .unwrap();
        let style = attr(e, "s").and_then(|s| s.parse().ok()).unwrap_or(0);
        let shared = attr(e, "t").as_deref() == Some("s");
        (row, style, shared)
    };
    let finish = |rows: &mut SheetOut, (row, style, shared): (u32, usize, bool), raw: &str| {
        let value = if shared {
            strings[raw.parse::<usize>().unwrap()].clone()
        } else {
            raw.to_string()
        };
        let fill = fills.get(style).cloned().flatten();
        rows.entry(row).or_default().push(CellOut { value, fill });
    };

    let mut r = Reader::from_str(xml);
    loop {
        match r.read_event().unwrap() {
            Event::Empty(e) if e.name().as_ref() == b"c" => finish(&mut rows, cell_of(&e), ""),
            Event::Start(e) if e.name().as_ref() == b"c" => {
                open = Some(cell_of(&e));
                value.clear();
            }
            Event::End(e) if e.name().as_ref() == b"c" => {
                if let Some(c) = open.take() {
                    finish(&mut rows, c, &value);
                }
            }
            Event::Start(e) if e.name().as_ref() == b"v" => in_v = true,
            Event::End(e) if e.name().as_ref() == b"v" => in_v = false,
            Event::Text(t) if in_v => value.push_str(&t.unescape().unwrap()),
            Event::Eof => break,
            _ => {}
        }
    }
    rows
}
