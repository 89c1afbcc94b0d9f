//! Output formatting for CLI

use crate::context::{MappingContext, SyncSummary};
use crate::errors::ErrorLevel;
use crate::models::{DocumentDefinition, DocumentStore, FieldId, MappedField, MappingModel};

/// Format a document's field tree, one field per line
pub fn format_document_tree(doc: &DocumentDefinition) -> String {
    let mut output = String::new();
    let side = if doc.is_source { "source" } else { "target" };
    output.push_str(&format!(
        "\n✅ {} ({}, {}): {} field(s), {} terminal\n",
        doc.id,
        doc.document_type,
        side,
        doc.field_count(),
        doc.terminal_fields().len()
    ));
    for ns in &doc.namespaces {
        let target = if ns.target_namespace { " [target]" } else { "" };
        output.push_str(&format!("  xmlns:{}={}{}\n", ns.alias, ns.uri, target));
    }
    for root in doc.root_fields() {
        write_field(doc, *root, 1, &mut output);
    }
    output
}

fn write_field(doc: &DocumentDefinition, id: FieldId, depth: usize, output: &mut String) {
    let field = doc.field(id);
    let mut markers = Vec::new();
    if field.enumeration {
        markers.push(format!("enum {}", field.enum_values.len()));
    }
    if field.is_collection() {
        markers.push(field.collection_type.as_str().to_lowercase());
    }
    if field.part_of_mapping {
        markers.push("mapped".to_string());
    }
    let markers = if markers.is_empty() {
        String::new()
    } else {
        format!(" [{}]", markers.join(", "))
    };
    output.push_str(&format!(
        "{}{} : {}{}\n",
        "  ".repeat(depth),
        field.path,
        field.field_type,
        markers
    ));
    for child in field.children() {
        write_field(doc, *child, depth + 1, output);
    }
}

/// Format the mappings of a context together with its error log
pub fn format_mapping_report(ctx: &MappingContext, summary: &SyncSummary) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "\n✅ {} mapping(s), {} lookup table(s)\n",
        ctx.mappings.mappings().len(),
        ctx.mappings.tables().count()
    ));
    if summary.stale_removed > 0 {
        output.push_str(&format!("  Removed {} stale mapping(s)\n", summary.stale_removed));
    }
    if summary.pending_fields > 0 {
        output.push_str(&format!("  {} field(s) still pending\n", summary.pending_fields));
    }

    for (idx, mapping) in ctx.mappings.mappings().iter().enumerate() {
        output.push_str(&format!("\nMapping {}: {}\n", idx + 1, mapping.uuid));
        write_mapping(mapping, &ctx.documents, &mut output);
    }

    let problems: Vec<_> = ctx
        .errors
        .entries()
        .iter()
        .filter(|e| e.level != ErrorLevel::Info)
        .collect();
    if problems.is_empty() {
        output.push_str("\n✅ No problems reported\n");
    } else {
        output.push_str("\n⚠️  Problems:\n");
        for entry in problems {
            output.push_str(&format!("  - {}\n", entry));
        }
    }
    output
}

fn write_mapping(mapping: &MappingModel, docs: &DocumentStore, output: &mut String) {
    for pair in &mapping.field_mappings {
        let sources = describe_side(pair.fields(true), docs);
        let targets = describe_side(pair.fields(false), docs);
        output.push_str(&format!(
            "  {} -> {} ({})\n",
            sources,
            targets,
            pair.transition.describe()
        ));
        if pair.unresolved_fields {
            output.push_str("    ⚠️  unresolved fields\n");
        }
    }
    for error in &mapping.validation_errors {
        output.push_str(&format!("    - {}\n", error));
    }
}

fn describe_side(fields: &[MappedField], docs: &DocumentStore) -> String {
    let names: Vec<String> = fields
        .iter()
        .filter_map(|mf| {
            let label = match (&mf.parsed_data, docs.field(mf.field)) {
                (Some(parsed), _) => format!("{} (pending)", parsed.path),
                (None, Some(field)) => field.path.clone(),
                (None, None) => return None,
            };
            Some(match mf.index() {
                Some(index) => format!("{}#{}", label, index),
                None => label,
            })
        })
        .collect();
    if names.is_empty() {
        "[None]".to_string()
    } else {
        names.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentType, Field, FieldNode, FieldType};

    #[test]
    fn test_document_tree_lists_nested_fields() {
        let mut doc = DocumentDefinition::new("person", "Person", "atlas:json:person", DocumentType::Json, true);
        doc.initialize_from_fields(vec![
            FieldNode::new(Field::new("address", FieldType::Complex)).with_children(vec![FieldNode::new(
                Field::new("city", FieldType::String),
            )]),
        ]);
        let output = format_document_tree(&doc);
        assert!(output.contains("person (JSON, source): 2 field(s), 1 terminal"));
        assert!(output.contains("    /address/city : STRING"));
    }
}
