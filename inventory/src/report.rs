use crate::error::{self, Result};
use crate::model::{AddonRecord, ClusterInventory, NodeGroupRecord, WorkloadKind};
use clap::ValueEnum;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use snafu::ResultExt;
use std::fmt::Write;
use tabled::object::Segment;
use tabled::{Alignment, Modify, Style, Table, Tabled};

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum ReportFormat {
    /// A JSON array with one object per cluster.
    Json,
    /// Plain text tables, one section per cluster.
    Table,
    /// A single worksheet with a cluster, node group and add-on section per cluster.
    Xlsx,
}

impl ReportFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Json => "application/json",
            ReportFormat::Table => "text/plain; charset=utf-8",
            ReportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// Render the inventory in `format`.
pub fn render(clusters: &[ClusterInventory], format: ReportFormat) -> Result<Vec<u8>> {
    match format {
        ReportFormat::Json => {
            let mut body = serde_json::to_vec_pretty(clusters).context(error::RenderJsonSnafu)?;
            body.push(b'\n');
            Ok(body)
        }
        ReportFormat::Table => Ok(render_tables(clusters).into_bytes()),
        ReportFormat::Xlsx => render_workbook(clusters).context(error::RenderXlsxSnafu),
    }
}

const WORKSHEET_NAME: &str = "EKS Inventory";
const CLUSTER_HEADERS: [&str; 4] = ["CLUSTER", "VERSION", "VPC", "REGION"];
const NODE_GROUP_HEADERS: [&str; 5] = [
    "NODE GROUP",
    "RELEASE",
    "INSTANCE TYPES",
    "AMI TYPE",
    "GPU",
];
const ADDON_HEADERS: [&str; 5] = ["ADD-ON", "VERSION", "STATUS", "SERVICE ACCOUNT", "PODS"];

/// Every cluster goes on the same worksheet: a header row and the cluster row, then the node
/// group table, then the add-on table, each followed by a blank row.
fn render_workbook(clusters: &[ClusterInventory]) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let wrap = Format::new().set_text_wrap();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(WORKSHEET_NAME)?;

    let mut row = 0;
    for cluster in clusters {
        write_headers(worksheet, row, &CLUSTER_HEADERS, &bold)?;
        row += 1;
        for (col, value) in [
            &cluster.name,
            &cluster.version,
            &cluster.vpc_id,
            &cluster.region,
        ]
        .into_iter()
        .enumerate()
        {
            worksheet.write_string(row, col as u16, value)?;
        }
        row += 2;

        write_headers(worksheet, row, &NODE_GROUP_HEADERS, &bold)?;
        row += 1;
        for node_group in &cluster.node_groups {
            worksheet.write_string(row, 0, &node_group.name)?;
            worksheet.write_string(row, 1, &node_group.release_version)?;
            worksheet.write_string(row, 2, &node_group.instance_types.join(", "))?;
            worksheet.write_string(row, 3, &node_group.ami_type)?;
            worksheet.write_boolean(row, 4, node_group.is_gpu)?;
            row += 1;
        }
        row += 1;

        write_headers(worksheet, row, &ADDON_HEADERS, &bold)?;
        row += 1;
        for addon in &cluster.addons {
            worksheet.write_string(row, 0, &addon.name)?;
            worksheet.write_string(row, 1, &addon.version)?;
            worksheet.write_string(row, 2, &addon.status)?;
            worksheet.write_string(row, 3, &addon.service_account)?;
            worksheet.write_string_with_format(row, 4, &addon.pods.join("\n"), &wrap)?;
            row += 1;
        }
        row += 1;
    }
    workbook.save_to_buffer()
}

fn write_headers(
    worksheet: &mut Worksheet,
    row: u32,
    headers: &[&str],
    format: &Format,
) -> std::result::Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        worksheet.write_string_with_format(row, col as u16, *header, format)?;
    }
    Ok(())
}

fn render_tables(clusters: &[ClusterInventory]) -> String {
    let mut out = String::new();
    for cluster in clusters {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{}", table(vec![ClusterRow::from(cluster)]));
        let _ = writeln!(
            out,
            "{}",
            table(cluster.node_groups.iter().map(NodeGroupRow::from).collect())
        );
        let _ = writeln!(
            out,
            "{}",
            table(cluster.addons.iter().map(AddonRow::from).collect())
        );
        if !cluster.absent_workloads.is_empty() {
            let _ = writeln!(
                out,
                "Not found in the cluster: {}\n",
                cluster.absent_workloads.join(", ")
            );
        }
    }
    out
}

fn table<T: Tabled>(rows: Vec<T>) -> String {
    Table::new(rows)
        .with(Style::blank())
        .with(Modify::new(Segment::all()).with(Alignment::left()))
        .to_string()
}

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "CLUSTER")]
    name: String,
    #[tabled(rename = "VERSION")]
    version: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "VPC")]
    vpc_id: String,
    #[tabled(rename = "REGION")]
    region: String,
    #[tabled(rename = "PODS")]
    pods: usize,
}

impl From<&ClusterInventory> for ClusterRow {
    fn from(cluster: &ClusterInventory) -> Self {
        Self {
            name: cluster.name.clone(),
            version: cluster.version.clone(),
            status: cluster.status.clone(),
            vpc_id: cluster.vpc_id.clone(),
            region: cluster.region.clone(),
            pods: cluster.namespace_pods.len(),
        }
    }
}

#[derive(Tabled)]
struct NodeGroupRow {
    #[tabled(rename = "NODE GROUP")]
    name: String,
    #[tabled(rename = "INSTANCE TYPES")]
    instance_types: String,
    #[tabled(rename = "AMI TYPE")]
    ami_type: String,
    #[tabled(rename = "GPU")]
    is_gpu: bool,
    #[tabled(rename = "VERSION")]
    version: String,
    #[tabled(rename = "RELEASE")]
    release_version: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "DESIRED")]
    #[tabled(display_with = "display_option")]
    desired_size: Option<i32>,
}

fn display_option(o: &Option<i32>) -> String {
    match o {
        Some(size) => format!("{}", size),
        None => "".to_string(),
    }
}

impl From<&NodeGroupRecord> for NodeGroupRow {
    fn from(node_group: &NodeGroupRecord) -> Self {
        Self {
            name: node_group.name.clone(),
            instance_types: node_group.instance_types.join(","),
            ami_type: node_group.ami_type.clone(),
            is_gpu: node_group.is_gpu,
            version: node_group.version.clone(),
            release_version: node_group.release_version.clone(),
            status: node_group.status.clone(),
            desired_size: node_group.desired_size,
        }
    }
}

#[derive(Tabled)]
struct AddonRow {
    #[tabled(rename = "ADD-ON")]
    name: String,
    #[tabled(rename = "KIND")]
    kind: &'static str,
    #[tabled(rename = "VERSION")]
    version: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "SERVICE ACCOUNT")]
    service_account: String,
    #[tabled(rename = "PODS")]
    pods: String,
}

impl From<&AddonRecord> for AddonRow {
    fn from(addon: &AddonRecord) -> Self {
        Self {
            name: addon.name.clone(),
            kind: match addon.kind {
                WorkloadKind::ManagedAddon => "add-on",
                WorkloadKind::Workload => "workload",
            },
            version: addon.version.clone(),
            status: addon.status.clone(),
            service_account: addon.service_account.clone(),
            pods: addon.pods.join(","),
        }
    }
}
