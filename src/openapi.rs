//! Static OpenAPI 3.0 description of the HTTP surface.

use serde_json::{Map, Value, json};

use crate::filter::KeyColumn;

pub const TITLE: &str = "Search and Operations of Sales";

fn string_param(name: &str, format: Option<&str>) -> Value {
    let mut schema = json!({ "type": "string" });
    if let Some(format) = format {
        schema["format"] = json!(format);
    }
    json!({ "name": name, "in": "query", "required": true, "schema": schema })
}

/// Wraps a GET operation and marks it as requiring a bearer token.
fn secured_get(operation: Value) -> Value {
    let mut operation = operation;
    operation["security"] = json!([{ "BearerAuth": [] }]);
    json!({ "get": operation })
}

fn search_operation(column: KeyColumn) -> Value {
    let entity = column.entity();
    secured_get(json!({
        "summary": format!("Get sales data by {entity}"),
        "description": format!("Retrieve sales for a specific {entity} within a date range."),
        "parameters": [
            string_param(column.query_param(), None),
            string_param("start_date", Some("date")),
            string_param("end_date", Some("date")),
        ],
        "responses": {
            "200": {
                "description": "Sales data retrieved successfully",
                "content": { "application/json": { "schema": {
                    "type": "array",
                    "items": { "type": "object", "additionalProperties": true }
                }}}
            },
            "400": { "description": "Invalid date format. Use YYYY-MM-DD." },
            "404": { "description": format!("No sales found for the given {entity} and date range.") }
        }
    }))
}

fn totals_operation(column: KeyColumn) -> Value {
    let entity = column.entity();
    secured_get(json!({
        "summary": format!("Get total and average sales by {entity}"),
        "parameters": [string_param(column.query_param(), None)],
        "responses": {
            "200": {
                "description": "Total and average sales",
                "content": { "application/json": { "schema": { "$ref": "#/components/schemas/SalesSummary" } } }
            },
            "404": { "description": "No sales data found." }
        }
    }))
}

/// Builds the OpenAPI document served at `/openapi.json`.
pub fn document() -> Value {
    let mut paths = Map::new();
    paths.insert(
        "/auth/login".to_string(),
        json!({
            "post": {
                "summary": "Exchange email and password for a bearer token",
                "requestBody": {
                    "required": true,
                    "content": { "application/json": { "schema": { "$ref": "#/components/schemas/LoginRequest" } } }
                },
                "responses": {
                    "200": { "description": "Token issued" },
                    "400": { "description": "Invalid credentials" }
                }
            }
        }),
    );
    for column in KeyColumn::ALL {
        let entity = column.entity();
        paths.insert(format!("/sales/{entity}/"), search_operation(column));
        paths.insert(format!("/sales/{entity}/total_avg/"), totals_operation(column));
    }
    paths.insert(
        "/sales/first_record/".to_string(),
        secured_get(json!({
            "summary": "Get the first record of the dataset",
            "responses": {
                "200": { "description": "First record" },
                "404": { "description": "No data available." }
            }
        })),
    );

    json!({
        "openapi": "3.0.0",
        "info": { "title": TITLE, "version": env!("CARGO_PKG_VERSION") },
        "paths": paths,
        "components": {
            "securitySchemes": {
                "BearerAuth": { "type": "http", "scheme": "bearer", "bearerFormat": "JWT" }
            },
            "schemas": {
                "LoginRequest": {
                    "type": "object",
                    "required": ["email", "password"],
                    "properties": {
                        "email": { "type": "string", "example": "test@mail.com" },
                        "password": { "type": "string", "example": "Test123" }
                    }
                },
                "SalesSummary": {
                    "type": "object",
                    "properties": {
                        "total_sales": { "type": "string", "example": "$1,234.56" },
                        "average_sales": { "type": "string", "example": "$123.46" }
                    }
                }
            }
        }
    })
}
