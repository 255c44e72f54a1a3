use csv::{ReaderBuilder, StringRecord, Trim};
use serde::{Deserialize, Serialize};

use super::error::TypeError;
use crate::INGREDIENT_FIELD_MAX_LENGTH;

/*
Ingredient seed data

name,measurement_unit
абрикосовое варенье,г
"salt, coarse",g
*/

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedIngredient {
    pub name: String,
    pub measurement_unit: String,
}

/// Parses the ingredient catalog CSV. A `name,measurement_unit` header is
/// optional and may follow blank lines or a byte order mark.
pub fn parse_ingredient_csv(input: &str) -> Result<Vec<SeedIngredient>, TypeError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(input.as_bytes());

    let mut rows = vec![];
    let mut seen_record = false;

    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        let line = record.position().map_or(0, |p| p.line());

        if record.iter().all(str::is_empty) {
            continue;
        }
        if !seen_record {
            seen_record = true;
            if is_header(&record) {
                continue;
            }
        }

        if record.len() != 2 {
            return Err(line_error(line, "Expected exactly two fields"));
        }
        let row: SeedIngredient = record
            .deserialize(None)
            .map_err(|e| line_error(line, &e.to_string()))?;

        if row.name.is_empty() || row.measurement_unit.is_empty() {
            return Err(line_error(line, "Empty field"));
        }
        if row.name.chars().count() > INGREDIENT_FIELD_MAX_LENGTH
            || row.measurement_unit.chars().count() > INGREDIENT_FIELD_MAX_LENGTH
        {
            return Err(line_error(line, "Field too long"));
        }

        rows.push(row);
    }

    Ok(rows)
}

fn is_header(record: &StringRecord) -> bool {
    record.len() == 2 && &record[0] == "name" && &record[1] == "measurement_unit"
}

fn line_error(line: u64, info: &str) -> TypeError {
    TypeError::new("csv", &format!("Line {line}: {info}"))
}

fn csv_error(error: csv::Error) -> TypeError {
    match error.position() {
        Some(position) => line_error(position.line(), &error.to_string()),
        None => TypeError::new("csv", &error.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(name: &str, unit: &str) -> SeedIngredient {
        SeedIngredient {
            name: name.to_owned(),
            measurement_unit: unit.to_owned(),
        }
    }

    #[test]
    fn header_and_blank_lines_are_skipped() {
        let rows = parse_ingredient_csv("name,measurement_unit\r\nflour,g\r\n\r\nmilk,ml\r\n").unwrap();
        assert_eq!(rows, vec![seed("flour", "g"), seed("milk", "ml")]);
    }

    #[test]
    fn header_after_bom_or_blank_lines_is_skipped() {
        let rows = parse_ingredient_csv("\u{feff}name,measurement_unit\nflour,g\n").unwrap();
        assert_eq!(rows, vec![seed("flour", "g")]);

        let rows = parse_ingredient_csv("\n\nname,measurement_unit\nflour,g\n").unwrap();
        assert_eq!(rows, vec![seed("flour", "g")]);
    }

    #[test]
    fn headerless_files_parse() {
        let rows = parse_ingredient_csv("абрикосовое варенье,г\nвода,мл").unwrap();
        assert_eq!(rows, vec![seed("абрикосовое варенье", "г"), seed("вода", "мл")]);
    }

    #[test]
    fn quoted_fields_keep_commas_quotes_and_newlines() {
        let rows =
            parse_ingredient_csv("\"salt, coarse\",g\n\"the \"\"best\"\" oil\",ml\n\"two\nlines\",g")
                .unwrap();
        assert_eq!(
            rows,
            vec![
                seed("salt, coarse", "g"),
                seed("the \"best\" oil", "ml"),
                seed("two\nlines", "g"),
            ]
        );
    }

    #[test]
    fn malformed_lines_report_their_number() {
        let error = parse_ingredient_csv("flour,g\nsugar\n").unwrap_err();
        assert!(error.to_string().starts_with("csv: Line 2:"), "{error}");

        let error = parse_ingredient_csv("flour,\n").unwrap_err();
        assert_eq!(error.to_string(), "csv: Line 1: Empty field");
    }
}
