//! egui rendering of bound node controls.

use crate::controls::{ControlBinder, ControlKind, ControlSpec};
use crate::pipeline::node::Node;
use crate::pipeline::value::ParamValue;
use egui::Ui;
use std::collections::BTreeMap;

struct ControlGroup {
    node: Node,
    spec: ControlSpec,
    /// In-progress text for `Text` fields, committed when the field loses focus.
    text: BTreeMap<String, String>,
}

/// One group of controls per bound node, rendered top to bottom in binding order.
#[derive(Default)]
pub struct EguiControlPanel {
    groups: Vec<ControlGroup>,
}

impl EguiControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.groups.iter().map(|g| &g.node)
    }

    /// Render every group. Returns the number of parameters edited this frame.
    pub fn show(&mut self, ui: &mut Ui) -> usize {
        let mut edits = 0;

        if self.groups.is_empty() {
            ui.label("No nodes chained");
            return edits;
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            for group in &mut self.groups {
                ui.heading(&group.spec.title);
                ui.separator();

                if group.spec.controls.is_empty() {
                    ui.weak("No editable parameters");
                }

                egui::Grid::new(format!("controls_{}", group.node.id()))
                    .num_columns(2)
                    .spacing([10.0, 8.0])
                    .show(ui, |ui| {
                        for field in &group.spec.controls {
                            ui.label(format!("{}:", field.name));
                            let current = group.node.param(&field.name).unwrap_or_else(|| field.value.clone());

                            match field.kind {
                                ControlKind::Integer => {
                                    let mut value = current.as_int().unwrap_or(0);
                                    if ui.add(egui::DragValue::new(&mut value).speed(1)).changed() {
                                        group.node.set_param(&field.name, value);
                                        edits += 1;
                                    }
                                }
                                ControlKind::Float => {
                                    let mut value = current.as_float().unwrap_or(0.0);
                                    if ui
                                        .add(egui::DragValue::new(&mut value).speed(0.01).max_decimals(4))
                                        .changed()
                                    {
                                        group.node.set_param(&field.name, value);
                                        edits += 1;
                                    }
                                }
                                ControlKind::Text => {
                                    let committed = current.as_str().unwrap_or_default().to_string();
                                    let buffer = group
                                        .text
                                        .entry(field.name.clone())
                                        .or_insert_with(|| committed.clone());
                                    let response =
                                        ui.add(egui::TextEdit::singleline(buffer).desired_width(150.0));
                                    if response.lost_focus() && *buffer != committed {
                                        group.node.set_param(&field.name, ParamValue::Str(buffer.clone()));
                                        edits += 1;
                                    } else if !response.has_focus() && *buffer != committed {
                                        // Edited elsewhere; follow the node.
                                        *buffer = committed;
                                    }
                                }
                            }
                            ui.end_row();
                        }
                    });

                if !group.spec.skipped.is_empty() {
                    ui.weak(format!("Not editable: {}", group.spec.skipped.join(", ")));
                }
                ui.add_space(16.0);
            }
        });

        edits
    }
}

impl ControlBinder for EguiControlPanel {
    /// Binding a node that is already shown replaces its group.
    fn bind(&mut self, node: &Node, spec: ControlSpec) {
        self.groups.retain(|g| !g.node.ptr_eq(node));
        self.groups.push(ControlGroup {
            node: node.clone(),
            spec,
            text: BTreeMap::new(),
        });
    }
}
