// Filling an existing xlsx template in place.
//
// Only the first worksheet is rewritten; every other part of the archive is
// copied byte for byte so styles, merged cells and print settings survive.
// Cells are patched by streaming the worksheet XML: a targeted cell keeps
// its attributes (notably the style `s`) and gets new content, cells and
// rows the template lacks are inserted in document order.
use crate::error::ReportError;
use crate::types::{CellAssignment, CellValue};
use crate::util::excel_serial;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const WORKBOOK_PATH: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PATH: &str = "xl/_rels/workbook.xml.rels";
const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
const CALC_CHAIN_PATH: &str = "xl/calcChain.xml";

#[derive(Debug, Clone)]
pub struct TemplateBook {
    bytes: Vec<u8>,
    sheet_path: String,
    sheet_xml: String,
}

impl TemplateBook {
    pub fn open(path: &Path) -> Result<Self, ReportError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ReportError::TemplateUnavailable(format!("{}: {}", path.display(), e)))?;
        Self::from_bytes(bytes)
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, ReportError> {
        let (sheet_path, sheet_xml) =
            read_first_sheet(&bytes).map_err(ReportError::TemplateUnavailable)?;
        log::debug!("Template worksheet: {}", sheet_path);
        Ok(TemplateBook { bytes, sheet_path, sheet_xml })
    }

    pub fn sheet_path(&self) -> &str {
        &self.sheet_path
    }

    pub fn apply(&mut self, cells: &[CellAssignment]) -> Result<(), ReportError> {
        self.sheet_xml = patch_sheet_xml(&self.sheet_xml, cells).map_err(ReportError::Unexpected)?;
        Ok(())
    }

    /// Serialise the workbook with the patched worksheet.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ReportError> {
        self.write_archive().map_err(ReportError::Unexpected)
    }

    fn write_archive(&self) -> Result<Vec<u8>, String> {
        let mut archive = ZipArchive::new(Cursor::new(self.bytes.as_slice())).map_err(|e| e.to_string())?;

        // The calculation chain would still list cells that are now plain
        // values; drop it and ask Excel to rebuild on open.
        let mut replaced: HashMap<String, String> = HashMap::new();
        replaced.insert(self.sheet_path.clone(), self.sheet_xml.clone());
        if let Ok(xml) = read_zip_text(&mut archive, WORKBOOK_PATH) {
            replaced.insert(WORKBOOK_PATH.to_string(), request_full_recalc(&xml)?);
        }
        if let Ok(xml) = read_zip_text(&mut archive, WORKBOOK_RELS_PATH) {
            let xml = drop_empty_elements(&xml, b"Relationship", |e| {
                attr_value(e, b"Type").is_some_and(|t| t.ends_with("/calcChain"))
            })?;
            replaced.insert(WORKBOOK_RELS_PATH.to_string(), xml);
        }
        if let Ok(xml) = read_zip_text(&mut archive, CONTENT_TYPES_PATH) {
            let xml = drop_empty_elements(&xml, b"Override", |e| {
                attr_value(e, b"PartName").is_some_and(|p| p == format!("/{}", CALC_CHAIN_PATH))
            })?;
            replaced.insert(CONTENT_TYPES_PATH.to_string(), xml);
        }

        let mut out = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        for i in 0..archive.len() {
            let entry = archive.by_index_raw(i).map_err(|e| e.to_string())?;
            let name = entry.name().to_string();
            if name == CALC_CHAIN_PATH {
                continue;
            }
            match replaced.get(&name) {
                Some(text) => {
                    drop(entry);
                    out.start_file(name.as_str(), options).map_err(|e| e.to_string())?;
                    out.write_all(text.as_bytes()).map_err(|e| e.to_string())?;
                }
                None => out.raw_copy_file(entry).map_err(|e| e.to_string())?,
            }
        }
        let cursor = out.finish().map_err(|e| e.to_string())?;
        Ok(cursor.into_inner())
    }
}

fn read_zip_text<R: Read + std::io::Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String, String> {
    let mut file = archive.by_name(path).map_err(|e| format!("{}: {}", path, e))?;
    let mut content = String::new();
    file.read_to_string(&mut content).map_err(|e| format!("{}: {}", path, e))?;
    Ok(content)
}

fn read_first_sheet(bytes: &[u8]) -> Result<(String, String), String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).map_err(|e| format!("not an xlsx archive: {}", e))?;
    let workbook_xml = read_zip_text(&mut archive, WORKBOOK_PATH)?;
    let rels_xml = read_zip_text(&mut archive, WORKBOOK_RELS_PATH)?;
    let sheet_path = first_worksheet_path(&workbook_xml, &rels_xml)
        .ok_or_else(|| "workbook has no worksheet".to_string())?;
    let sheet_xml = read_zip_text(&mut archive, &sheet_path)?;
    Ok((sheet_path, sheet_xml))
}

fn attr_value(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .map(|a| String::from_utf8_lossy(&a.value).into_owned())
}

/// Archive path of the first `<sheet>` in workbook.xml, resolved through
/// the workbook relationships.
fn first_worksheet_path(workbook_xml: &str, rels_xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut rid = None;
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"sheet" => {
                rid = attr_value(e, b"r:id");
                break;
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
    }
    let rid = rid?;

    let mut reader = Reader::from_str(rels_xml);
    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" && attr_value(e, b"Id").as_deref() == Some(rid.as_str()) =>
            {
                let target = attr_value(e, b"Target")?;
                return Some(match target.strip_prefix('/') {
                    Some(absolute) => absolute.to_string(),
                    None => format!("xl/{}", target),
                });
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }
}

/// `"M29"` to 1-based `(column, row)`.
pub fn parse_cell_ref(address: &str) -> Option<(u32, u32)> {
    let address = address.trim().trim_start_matches('$');
    let split = address.find(|c: char| !c.is_ascii_alphabetic())?;
    let (letters, digits) = address.split_at(split);
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let col = letters
        .chars()
        .fold(0u32, |acc, c| acc * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1));
    let row = digits.trim_start_matches('$').parse::<u32>().ok().filter(|r| *r > 0)?;
    Some((col, row))
}

pub fn col_to_name(mut col: u32) -> String {
    let mut name = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        name.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    name.iter().rev().collect()
}

type XmlWriter = Writer<Vec<u8>>;
type RowCells<'v> = BTreeMap<u32, &'v CellValue>;

fn emit(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), String> {
    writer.write_event(event).map_err(|e| format!("writing worksheet XML: {}", e))
}

fn xml_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Write one `<c>`; `original` supplies the attributes to keep.
fn write_cell(
    writer: &mut XmlWriter,
    original: Option<&BytesStart<'_>>,
    address: &str,
    value: &CellValue,
) -> Result<(), String> {
    let mut start = BytesStart::new("c");
    match original {
        Some(e) => {
            for attr in e.attributes().flatten() {
                if attr.key.as_ref() != b"t" {
                    start.push_attribute(attr);
                }
            }
        }
        None => start.push_attribute(("r", address)),
    }

    let number = match value {
        CellValue::Text(text) => {
            start.push_attribute(("t", "inlineStr"));
            emit(writer, Event::Start(start))?;
            emit(writer, Event::Start(BytesStart::new("is")))?;
            let t = if text.trim() != text {
                BytesStart::new("t").with_attributes([("xml:space", "preserve")])
            } else {
                BytesStart::new("t")
            };
            emit(writer, Event::Start(t))?;
            emit(writer, Event::Text(BytesText::new(text)))?;
            emit(writer, Event::End(BytesEnd::new("t")))?;
            emit(writer, Event::End(BytesEnd::new("is")))?;
            return emit(writer, Event::End(BytesEnd::new("c")));
        }
        CellValue::Number(n) => *n,
        CellValue::Date(d) => excel_serial(*d),
    };
    emit(writer, Event::Start(start))?;
    emit(writer, Event::Start(BytesStart::new("v")))?;
    emit(writer, Event::Text(BytesText::new(&xml_number(number))))?;
    emit(writer, Event::End(BytesEnd::new("v")))?;
    emit(writer, Event::End(BytesEnd::new("c")))
}

fn write_new_cells(writer: &mut XmlWriter, row: u32, cells: RowCells<'_>) -> Result<(), String> {
    for (col, value) in cells {
        let address = format!("{}{}", col_to_name(col), row);
        write_cell(writer, None, &address, value)?;
    }
    Ok(())
}

/// Emit whole new rows for pending rows numbered below `before` (all of
/// them when `before` is `None`).
fn flush_rows(
    writer: &mut XmlWriter,
    pending: &mut BTreeMap<u32, RowCells<'_>>,
    before: Option<u32>,
) -> Result<(), String> {
    let keep = match before {
        Some(row) => pending.split_off(&row),
        None => BTreeMap::new(),
    };
    let ready = std::mem::replace(pending, keep);
    for (row, cells) in ready {
        let r = row.to_string();
        emit(writer, Event::Start(BytesStart::new("row").with_attributes([("r", r.as_str())])))?;
        write_new_cells(writer, row, cells)?;
        emit(writer, Event::End(BytesEnd::new("row")))?;
    }
    Ok(())
}

fn end_of(e: &BytesStart<'_>) -> BytesEnd<'static> {
    BytesEnd::new(String::from_utf8_lossy(e.name().as_ref()).into_owned())
}

/// Rewrite worksheet XML so every assignment's cell holds its new value.
/// When an address is assigned twice the later value wins.
pub fn patch_sheet_xml(xml: &str, cells: &[CellAssignment]) -> Result<String, String> {
    let mut pending: BTreeMap<u32, RowCells<'_>> = BTreeMap::new();
    for cell in cells {
        let (col, row) = parse_cell_ref(&cell.address)
            .ok_or_else(|| format!("invalid cell address '{}'", cell.address))?;
        pending.entry(row).or_default().insert(col, &cell.value);
    }

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut current: Option<(u32, RowCells<'_>)> = None;
    let mut last_row = 0u32;
    // Depth inside a replaced cell whose original content is being dropped.
    let mut skipping: Option<usize> = None;

    loop {
        let event = reader.read_event().map_err(|e| format!("worksheet XML: {}", e))?;

        if let Some(depth) = skipping {
            skipping = match event {
                Event::Start(_) => Some(depth + 1),
                Event::End(_) if depth == 0 => None,
                Event::End(_) => Some(depth - 1),
                Event::Eof => return Err("worksheet XML ends inside a cell".to_string()),
                _ => Some(depth),
            };
            continue;
        }

        let is_start = matches!(event, Event::Start(_));
        match event {
            Event::Eof => break,
            Event::Start(ref e) if e.local_name().as_ref() == b"sheetData" => {
                emit(&mut writer, Event::Start(e.clone()))?;
            }
            Event::Empty(ref e) if e.local_name().as_ref() == b"sheetData" => {
                emit(&mut writer, Event::Start(e.clone()))?;
                flush_rows(&mut writer, &mut pending, None)?;
                emit(&mut writer, Event::End(end_of(e)))?;
            }
            Event::End(ref e) if e.local_name().as_ref() == b"sheetData" => {
                flush_rows(&mut writer, &mut pending, None)?;
                emit(&mut writer, Event::End(e.clone()))?;
            }
            Event::Start(ref e) | Event::Empty(ref e) if e.local_name().as_ref() == b"row" => {
                let row = attr_value(e, b"r").and_then(|r| r.parse().ok()).unwrap_or(last_row + 1);
                last_row = row;
                flush_rows(&mut writer, &mut pending, Some(row))?;
                let cells = pending.remove(&row).unwrap_or_default();
                if is_start {
                    emit(&mut writer, Event::Start(e.clone()))?;
                    current = Some((row, cells));
                } else if cells.is_empty() {
                    emit(&mut writer, Event::Empty(e.clone()))?;
                } else {
                    emit(&mut writer, Event::Start(e.clone()))?;
                    write_new_cells(&mut writer, row, cells)?;
                    emit(&mut writer, Event::End(end_of(e)))?;
                }
            }
            Event::End(ref e) if e.local_name().as_ref() == b"row" => {
                if let Some((row, cells)) = current.take() {
                    write_new_cells(&mut writer, row, cells)?;
                }
                emit(&mut writer, Event::End(e.clone()))?;
            }
            Event::Start(ref e) | Event::Empty(ref e)
                if e.local_name().as_ref() == b"c" && current.is_some() =>
            {
                let address = attr_value(e, b"r");
                let col = address.as_deref().and_then(parse_cell_ref).map(|(col, _)| col);
                let mut replaced = false;
                if let (Some(col), Some((row, cells))) = (col, current.as_mut()) {
                    let later = cells.split_off(&col);
                    let earlier = std::mem::replace(cells, later);
                    write_new_cells(&mut writer, *row, earlier)?;
                    if let Some(value) = cells.remove(&col) {
                        write_cell(&mut writer, Some(e), address.as_deref().unwrap_or_default(), value)?;
                        replaced = true;
                    }
                }
                if !replaced {
                    emit(&mut writer, event.clone())?;
                } else if is_start {
                    skipping = Some(0);
                }
            }
            other => emit(&mut writer, other)?,
        }
    }

    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

/// Set `fullCalcOnLoad` on an existing `<calcPr>` so template formulas pick
/// up the new values when the file is opened.
fn request_full_recalc(workbook_xml: &str) -> Result<String, String> {
    let mut reader = Reader::from_str(workbook_xml);
    let mut writer = Writer::new(Vec::new());
    loop {
        let event = reader.read_event().map_err(|e| format!("workbook XML: {}", e))?;
        match event {
            Event::Eof => break,
            Event::Empty(ref e) if e.local_name().as_ref() == b"calcPr" => {
                let mut calc = BytesStart::new(String::from_utf8_lossy(e.name().as_ref()).into_owned());
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() != b"fullCalcOnLoad" {
                        calc.push_attribute(attr);
                    }
                }
                calc.push_attribute(("fullCalcOnLoad", "1"));
                emit(&mut writer, Event::Empty(calc))?;
            }
            other => emit(&mut writer, other)?,
        }
    }
    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}

/// Remove self-closing `tag` elements that match `pred`.
fn drop_empty_elements<F>(xml: &str, tag: &[u8], pred: F) -> Result<String, String>
where
    F: Fn(&BytesStart<'_>) -> bool,
{
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match event {
            Event::Eof => break,
            Event::Empty(ref e) if e.local_name().as_ref() == tag && pred(e) => {}
            other => emit(&mut writer, other)?,
        }
    }
    String::from_utf8(writer.into_inner()).map_err(|e| e.to_string())
}
