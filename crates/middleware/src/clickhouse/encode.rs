use serde_json::{Map, Value};

use tickrelay_schema::{Block, ColumnData};

/// `INSERT INTO <db>.<table> (<cols>) FORMAT JSONEachRow`
pub fn insert_query(database: &str, block: &Block) -> String {
    let columns = block
        .columns
        .iter()
        .map(|c| format!("`{}`", c.name))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "INSERT INTO `{}`.`{}` ({}) FORMAT JSONEachRow",
        database, block.table, columns
    )
}

fn cell(data: &ColumnData, row: usize) -> Value {
    match data {
        // DateTime64(3) takes an integer as a scaled unix timestamp
        ColumnData::DateTime64Millis(v) => Value::from(v[row]),
        ColumnData::String(v) => Value::from(v[row].as_str()),
        ColumnData::Float64(v) => Value::from(v[row]),
        ColumnData::NullableFloat64(v) => v[row].map(Value::from).unwrap_or(Value::Null),
    }
}

/// One JSON object per line, keyed by column name
pub fn encode_json_each_row(block: &Block) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for row in 0..block.row_count() {
        let mut object = Map::with_capacity(block.columns.len());
        for column in &block.columns {
            object.insert(column.name.to_string(), cell(&column.data, row));
        }
        body.push_str(&serde_json::to_string(&Value::Object(object))?);
        body.push('\n');
    }
    Ok(body)
}
