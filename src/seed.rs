//! Default pipeline and sample data

use crate::error::Result;
use crate::models::{NewRecord, NewStage, Priority, Record, Stage};
use crate::pipeline::Pipeline;

/// The standard job flow of a service business, in board order
pub const DEFAULT_STAGES: [(&str, &str); 10] = [
    ("Work Order Received", "Initial work order intake"),
    ("Bidding", "Preparing bid for client"),
    ("Bid Submitted to Client", "Awaiting client decision"),
    ("Approved – Ready to Schedule", "Client approved, ready for scheduling"),
    ("In Progress", "Work is being performed"),
    ("Awaiting Documentation", "Work complete, gathering documents"),
    ("Ready to Invoice", "Ready to send invoice"),
    ("Invoice Sent", "Invoice sent to client"),
    ("Paid", "Payment received"),
    ("Closed", "Project completed and closed"),
];

/// (project, customer, priority, description, index into the default stages)
const SAMPLE_RECORDS: [(&str, &str, Priority, &str, usize); 5] = [
    ("Kitchen Renovation", "John Smith", Priority::High, "Complete kitchen remodel", 0),
    ("Bathroom Repair", "Sarah Johnson", Priority::Medium, "Fix plumbing issues", 0),
    ("Roof Replacement", "Mike Davis", Priority::High, "Replace old roof", 1),
    ("Electrical Upgrade", "Emily Brown", Priority::Medium, "Upgrade electrical panel", 4),
    ("HVAC Installation", "David Wilson", Priority::Low, "Install new HVAC system", 4),
];

/// Install the default stages. Does nothing when any stage exists already.
pub fn install_default_stages(pipeline: &Pipeline) -> Result<Vec<Stage>> {
    if !pipeline.list_stages()?.is_empty() {
        log::info!("Stages already present, skipping default pipeline");
        return Ok(Vec::new());
    }

    let mut created = Vec::with_capacity(DEFAULT_STAGES.len());
    for (name, description) in DEFAULT_STAGES {
        let mut stage = NewStage::named(name);
        stage.description = Some(description.to_string());
        created.push(pipeline.create_stage(&stage)?);
    }
    Ok(created)
}

/// Add the sample records to the current stages (by board order).
///
/// Samples whose stage index is beyond the board are placed in the last stage.
pub fn install_sample_records(pipeline: &Pipeline, actor: Option<&str>) -> Result<Vec<Record>> {
    let stages = pipeline.list_stages()?;
    let Some(last) = stages.last() else {
        return Ok(Vec::new());
    };

    let mut created = Vec::with_capacity(SAMPLE_RECORDS.len());
    for (project, customer, priority, description, index) in SAMPLE_RECORDS {
        let stage = stages.get(index).unwrap_or(last);
        let mut data = NewRecord::new(stage.id, project, customer);
        data.priority = Some(priority);
        data.description = Some(description.to_string());
        created.push(pipeline.create_record(&data, actor)?);
    }
    Ok(created)
}
