//! Turns an intent extraction response into archive selections.

use cds_request::{ArchiveSelection, CdsRequestError, ClimateRequest, Intent, RequestEngine};

const RESPONSE: &str = "Here is what I found:
{'request_type': 'True', 'locations': ['Rome', 'London'],
 'timeframes': ['05/10/2021', '15/11/2021', '2015-01-01', '2020-12-31'],
 'product': ['Temperature'], 'specific_product': ['2m temperature'],
 'analysis': 'comparison', 'visualisation': 'line_chart',
 'multi_location': 'True', 'multi_time': 'True'}";

#[tokio::main]
async fn main() -> Result<(), CdsRequestError> {
    let engine = RequestEngine::new().await?;

    let mut request = ClimateRequest::from(Intent::from_response(RESPONSE)?);
    request.process()?;
    if !request.request_valid {
        println!("{}", request.missing_info_message());
        return Ok(());
    }
    println!("{}", request.summary());

    let sub_requests = engine.decompose().request(&mut request).call().await?;
    for sub_request in &sub_requests {
        let selection = ArchiveSelection::for_sub_request(sub_request, engine.config())?;
        println!("{}", sub_request);
        match selection.to_json() {
            Ok(body) => println!("  {} {}", selection.dataset, body),
            Err(e) => println!("  could not render selection: {}", e),
        }
    }

    Ok(())
}
