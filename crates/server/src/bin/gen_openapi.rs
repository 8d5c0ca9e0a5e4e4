//! Print the ELSY OpenAPI document as JSON, e.g. `gen-openapi > openapi.json`.

use server::openapi::ApiDoc;
use utoipa::OpenApi;

fn main() -> Result<(), serde_json::Error> {
    println!("{}", ApiDoc::openapi().to_pretty_json()?);
    Ok(())
}
