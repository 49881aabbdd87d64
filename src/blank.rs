// Built-in blank form, laid out on the same grid the report writes to.
// Used when no template workbook is supplied.
use crate::error::ReportError;
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, XlsxError};

pub const SHEET_NAME: &str = "利用実績簿";

fn build() -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let title = Format::new().set_bold().set_font_size(16).set_align(FormatAlign::Center);
    let label = Format::new().set_bold();
    let boxed = Format::new().set_border(FormatBorder::Thin).set_align(FormatAlign::Center);
    let amount = Format::new().set_border(FormatBorder::Thin).set_num_format("#,##0");
    let date = Format::new().set_num_format("yyyy/mm/dd");

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    sheet.merge_range(0, 0, 0, 15, "高速道路等利用実績簿", &title)?;

    // Row 3: 所属 / 職名 / 氏名
    sheet.write_string_with_format(2, 1, "所属", &label)?;
    sheet.write_string_with_format(2, 9, "職名", &label)?;
    sheet.write_string_with_format(2, 12, "氏名", &label)?;

    // Rows 5-6: 令和 B5 年 D5 月分, section M5 ~ P5, fee M6
    sheet.write_string_with_format(4, 0, "令和", &label)?;
    sheet.write_string(4, 2, "年")?;
    sheet.write_string(4, 4, "月分")?;
    sheet.write_string_with_format(4, 11, "利用区間", &label)?;
    sheet.write_string(4, 14, "～")?;
    sheet.write_string_with_format(5, 11, "片道料金", &label)?;

    // Row 13: column headings for both day bands.
    for (col, text) in [
        (1, "日"),
        (3, "午前"),
        (4, "金額"),
        (6, "午後"),
        (7, "金額"),
        (9, "日"),
        (11, "午前"),
        (12, "金額"),
        (14, "午後"),
        (15, "金額"),
    ] {
        sheet.write_string_with_format(12, col, text, &boxed)?;
    }

    // Day numbers: 1-15 down column B, 16-31 down column J.
    for day in 1..=31u32 {
        let (row, col) = match day {
            1..=15 => (day + 12, 1),
            16..=30 => (day - 15 + 12, 9),
            _ => (28, 9),
        };
        sheet.write_number_with_format(row, col, day, &boxed)?;
        for amount_col in [col + 3, col + 6] {
            sheet.write_blank(row, amount_col, &amount)?;
        }
    }

    sheet.write_string_with_format(55, 3, "開始日", &label)?;
    sheet.write_string_with_format(56, 3, "終了日", &label)?;
    sheet.write_blank(55, 4, &date)?;
    sheet.write_blank(56, 4, &date)?;

    sheet.set_column_width(0, 5)?;
    for col in [4, 7, 12, 15] {
        sheet.set_column_width(col, 10)?;
    }

    workbook.save_to_buffer()
}

/// Bytes of the blank form workbook.
pub fn blank_template() -> Result<Vec<u8>, ReportError> {
    build().map_err(|e| ReportError::TemplateUnavailable(format!("building blank form: {}", e)))
}
