//! # Dataset Information
//!
//! Summarises the structure of an ADCP dataset: dimensions, variables with
//! their attributes, global attributes, and which variables carry
//! quality-control flags.

use crate::dataset::{AdcpDataset, DatasetSource, attribute_to_string};
use anyhow::{Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DimensionInfo {
    pub name: String,
    pub length: usize,
    pub is_unlimited: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariableInfo {
    pub name: String,
    pub data_type: String,
    pub dimensions: Vec<String>,
    pub shape: Vec<usize>,
    pub attributes: BTreeMap<String, String>,
}

impl VariableInfo {
    /// True when the variable carries CF `flag_meanings`.
    pub fn is_quality_control(&self) -> bool {
        self.attributes.contains_key("flag_meanings")
    }
}

/// Everything `info` reports about one dataset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub path: String,
    pub title: Option<String>,
    pub dimensions: Vec<DimensionInfo>,
    pub variables: Vec<VariableInfo>,
    pub quality_control_variables: Vec<String>,
    pub global_attributes: BTreeMap<String, String>,
    pub file_size: Option<u64>,
    pub total_variables: usize,
    pub total_dimensions: usize,
}

/// Reads the structure of the dataset at `file_path`.
///
/// `variable` restricts the variable list to one name. Global attributes are
/// only collected when `detailed` is set.
pub async fn get_dataset_info(file_path: &str, variable: Option<&str>, detailed: bool) -> Result<DatasetInfo> {
    let dataset = AdcpDataset::open(file_path, false)
        .await
        .with_context(|| format!("Failed to open dataset: {}", file_path))?;
    let file = dataset.file();

    let file_size = match dataset.source() {
        DatasetSource::Local(path) => tokio::fs::metadata(path).await.ok().map(|m| m.len()),
        _ => None,
    };

    let dimensions: Vec<DimensionInfo> = file
        .dimensions()
        .map(|dim| DimensionInfo {
            name: dim.name().to_string(),
            length: dim.len(),
            is_unlimited: dim.is_unlimited(),
        })
        .collect();

    let mut variables = Vec::new();
    for var in file.variables() {
        if let Some(var_name) = variable
            && var.name() != var_name
        {
            continue;
        }

        let attributes = var
            .attributes()
            .filter_map(|attr| {
                let value = attr.value().ok()?;
                Some((attr.name().to_string(), attribute_to_string(&value)))
            })
            .collect();

        variables.push(VariableInfo {
            name: var.name().to_string(),
            data_type: format!("{:?}", var.vartype()),
            dimensions: var.dimensions().iter().map(|d| d.name().to_string()).collect(),
            shape: var.dimensions().iter().map(|d| d.len()).collect(),
            attributes,
        });
    }

    if let Some(var_name) = variable
        && variables.is_empty()
    {
        anyhow::bail!("Variable '{}' not found in {}", var_name, file_path);
    }

    let quality_control_variables = variables
        .iter()
        .filter(|v| v.is_quality_control())
        .map(|v| v.name.clone())
        .collect();

    let global_attributes = if detailed {
        dataset.global_attributes()
    } else {
        BTreeMap::new()
    };
    debug!(
        "{}: {} dimensions, {} variables",
        file_path,
        dimensions.len(),
        variables.len()
    );

    Ok(DatasetInfo {
        path: file_path.to_string(),
        title: dataset.title(),
        total_dimensions: dimensions.len(),
        total_variables: variables.len(),
        dimensions,
        variables,
        quality_control_variables,
        global_attributes,
        file_size,
    })
}

pub fn print_dataset_info_human(info: &DatasetInfo) {
    println!("ADCP Dataset Information:");
    println!("  Path: {}", info.path);
    if let Some(title) = &info.title {
        println!("  Title: {}", title);
    }
    if let Some(size) = info.file_size {
        println!("  File Size: {:.2} MB", size as f64 / 1_048_576.0);
    }
    println!("  Dimensions: {} total", info.total_dimensions);
    for dim in &info.dimensions {
        println!(
            "    {} ({}{})",
            dim.name,
            dim.length,
            if dim.is_unlimited { ", unlimited" } else { "" }
        );
    }
    println!("  Variables: {} total", info.total_variables);
    for var in &info.variables {
        println!(
            "    {} ({}) - dimensions: [{}]",
            var.name,
            var.data_type,
            var.dimensions.join(", ")
        );
        for (name, value) in &var.attributes {
            println!("      @{}: {}", name, value);
        }
    }
    if !info.quality_control_variables.is_empty() {
        println!(
            "  Quality-control variables: {}",
            info.quality_control_variables.join(", ")
        );
    }
    if !info.global_attributes.is_empty() {
        println!("  Global Attributes:");
        for (name, value) in &info.global_attributes {
            println!("    @{}: {}", name, value);
        }
    }
}

pub fn print_dataset_info_json(info: &DatasetInfo) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(info)?);
    Ok(())
}

pub fn print_dataset_info_yaml(info: &DatasetInfo) -> Result<()> {
    let yaml = serde_yaml::to_string(info).context("Failed to serialize dataset info to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// Variables as CSV rows; the most useful tabular view of a dataset.
pub fn print_dataset_info_csv(info: &DatasetInfo) -> Result<()> {
    println!("variable_name,data_type,dimensions,shape,attributes_count,quality_control");
    for var in &info.variables {
        let shape: Vec<String> = var.shape.iter().map(|s| s.to_string()).collect();
        println!(
            "{},{},\"{}\",\"{}\",{},{}",
            var.name,
            var.data_type,
            var.dimensions.join(";"),
            shape.join(";"),
            var.attributes.len(),
            var.is_quality_control()
        );
    }
    Ok(())
}
