//! Item/association index.
//!
//! Loads the flat item and association lists of a [`CasePackage`] into lookup
//! tables: items by identifier, associations by origin and by destination.
//! Associations whose endpoints are unknown are kept aside as dangling
//! references instead of entering the lookup tables.

use std::collections::HashMap;

use tracing::{debug, instrument, warn};

use casegraph_shared::{Association, CaseGraphError, CasePackage, Item, ItemKind, Result};

use crate::report::Anomaly;

/// Borrowed lookup structures over one package.
#[derive(Debug)]
pub struct PackageIndex<'a> {
    items: HashMap<&'a str, &'a Item>,
    /// Identifiers in first-appearance order.
    order: Vec<&'a str>,
    associations: Vec<&'a Association>,
    outgoing: HashMap<&'a str, Vec<usize>>,
    incoming: HashMap<&'a str, Vec<usize>>,
    dangling: Vec<&'a Association>,
    anomalies: Vec<Anomaly>,
}

impl<'a> PackageIndex<'a> {
    /// Index a package. Never fails: defects are logged and kept as anomalies.
    #[instrument(skip_all, fields(items = package.items.len(), associations = package.associations.len()))]
    pub fn build(package: &'a CasePackage) -> Self {
        let mut index = Self {
            items: HashMap::with_capacity(package.items.len()),
            order: Vec::with_capacity(package.items.len()),
            associations: Vec::with_capacity(package.associations.len()),
            outgoing: HashMap::new(),
            incoming: HashMap::new(),
            dangling: Vec::new(),
            anomalies: Vec::new(),
        };

        for (position, item) in package.items.iter().enumerate() {
            let id = item.identifier.trim();
            if id.is_empty() {
                warn!(position, "item without identifier skipped");
                index.anomalies.push(Anomaly::EmptyIdentifier { position });
                continue;
            }

            // Last write wins; the first appearance fixes the iteration order.
            if index.items.insert(id, item).is_some() {
                warn!(identifier = id, "duplicate item identifier, keeping the last one");
                index.anomalies.push(Anomaly::DuplicateItem {
                    identifier: id.to_string(),
                });
            } else {
                index.order.push(id);
            }
        }

        for assoc in &package.associations {
            let missing: Vec<String> = [assoc.origin.as_str(), assoc.destination.as_str()]
                .into_iter()
                .filter(|id| !index.items.contains_key(id.trim()))
                .map(str::to_string)
                .collect();

            if !missing.is_empty() {
                warn!(
                    origin = %assoc.origin,
                    destination = %assoc.destination,
                    ?missing,
                    "association references unknown item"
                );
                index.anomalies.push(Anomaly::DanglingReference {
                    origin: assoc.origin.clone(),
                    destination: assoc.destination.clone(),
                    missing,
                });
                index.dangling.push(assoc);
                continue;
            }

            let slot = index.associations.len();
            index.associations.push(assoc);
            index
                .outgoing
                .entry(assoc.origin.trim())
                .or_default()
                .push(slot);
            index
                .incoming
                .entry(assoc.destination.trim())
                .or_default()
                .push(slot);
        }

        debug!(
            items = index.order.len(),
            associations = index.associations.len(),
            dangling = index.dangling.len(),
            "package indexed"
        );

        index
    }

    /// Look up an item by identifier.
    pub fn item(&self, id: &str) -> Option<&'a Item> {
        self.items.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// Number of distinct items.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Distinct items in first-appearance order.
    pub fn items(&self) -> impl Iterator<Item = &'a Item> {
        self.order.iter().map(|id| self.items[id])
    }

    /// Distinct items of one kind, in first-appearance order.
    pub fn items_of_kind(&self, kind: ItemKind) -> impl Iterator<Item = &'a Item> {
        self.items().filter(move |item| item.kind == kind)
    }

    /// Associations whose origin is `id`, in declaration order.
    pub fn outgoing(&self, id: &str) -> impl Iterator<Item = &'a Association> {
        self.slots(self.outgoing.get(id))
    }

    /// Associations whose destination is `id`, in declaration order.
    pub fn incoming(&self, id: &str) -> impl Iterator<Item = &'a Association> {
        self.slots(self.incoming.get(id))
    }

    /// Identifiers of the hierarchical children of `id` (origins of
    /// `isChildOf`/`isPartOf` edges pointing at it), in declaration order.
    pub fn children_of(&self, id: &str) -> impl Iterator<Item = &'a Association> {
        self.incoming(id).filter(|a| a.kind.is_hierarchical())
    }

    /// Identifiers of the hierarchical parents of `id`, in declaration order.
    pub fn parents_of(&self, id: &str) -> impl Iterator<Item = &'a Association> {
        self.outgoing(id).filter(|a| a.kind.is_hierarchical())
    }

    /// Associations excluded because an endpoint is unknown.
    pub fn dangling(&self) -> &[&'a Association] {
        &self.dangling
    }

    /// Defects found while indexing.
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    /// Fail if any association references an identifier absent from the items.
    pub fn check_references(&self) -> Result<()> {
        if self.dangling.is_empty() {
            return Ok(());
        }

        let detail = self
            .dangling
            .iter()
            .map(|a| format!("{} -> {}", a.origin, a.destination))
            .collect::<Vec<_>>()
            .join(", ");

        Err(CaseGraphError::malformed(format!(
            "{} association(s) reference unknown items: {detail}",
            self.dangling.len()
        )))
    }

    fn slots(&self, slots: Option<&Vec<usize>>) -> impl Iterator<Item = &'a Association> {
        let associations = &self.associations;
        slots
            .into_iter()
            .flatten()
            .map(move |&slot| associations[slot])
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
