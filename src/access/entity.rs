//! Per-entity metadata handed to the generic runtime at construction.

/// One navigable relation: records of `collection` whose `foreign_key` equals our `local_key`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelationMeta {
    pub name: String,
    pub collection: String,
    pub local_key: String,
    pub foreign_key: String,
    pub many: bool,
}

impl RelationMeta {
    pub fn to_one(
        name: impl Into<String>,
        collection: impl Into<String>,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            local_key: local_key.into(),
            foreign_key: foreign_key.into(),
            many: false,
        }
    }

    pub fn to_many(
        name: impl Into<String>,
        collection: impl Into<String>,
        local_key: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            many: true,
            ..Self::to_one(name, collection, local_key, foreign_key)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityMeta {
    /// Model name as declared in the schema, e.g. `Song`.
    pub name: String,
    /// Store collection, the lower-cased model name.
    pub collection: String,
    pub relations: Vec<RelationMeta>,
}

impl EntityMeta {
    pub fn new(name: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            collection: collection.into(),
            relations: Vec::new(),
        }
    }

    /// Metadata for a model name, using the lower-cased name as collection.
    pub fn for_model(name: &str) -> Self {
        Self::new(name, name.to_lowercase())
    }

    pub fn with_relation(mut self, relation: RelationMeta) -> Self {
        self.relations.push(relation);
        self
    }

    pub fn relation(&self, name: &str) -> Option<&RelationMeta> {
        self.relations.iter().find(|r| r.name == name)
    }
}
