//! Query builder for document entities
//!
//! Combines an entity's base predicate with composed client filters and runs the
//! count/find pair against a [`DocumentStore`], producing either a plain list, an
//! offset page or a cursor connection.

use std::marker::PhantomData;

use bson::{Bson, Document, doc};

use super::compilers::parse_object_id;
use super::composer::{FilterExpression, compose};
use super::error::{FilterError, QueryError};
use super::traits::{DocumentEntity, ID_FIELD};
use crate::db::{DocumentStore, FindOptions};
use crate::graphql::pagination::{
    Connection, Pagination, cursor_page, cursor_page_exact, get_offset, offset_page,
};

/// A query builder for document entities.
pub struct EntityQuery<E: DocumentEntity> {
    _phantom: PhantomData<E>,
    predicate: Document,
    sort: Option<Document>,
    skip: Option<u64>,
    limit: Option<i64>,
}

impl<E: DocumentEntity> EntityQuery<E> {
    /// Start from the entity's base predicate.
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
            predicate: E::base_predicate(),
            sort: None,
            skip: None,
            limit: None,
        }
    }

    /// Conjoin a client filter expression.
    pub fn filter(mut self, filter: Option<&FilterExpression>) -> Result<Self, FilterError> {
        let fragment = compose(E::registry(), filter)?;
        self.predicate = merge_predicates(self.predicate, fragment);
        Ok(self)
    }

    /// Conjoin a raw condition on one stored field.
    pub fn where_clause(mut self, field: &str, condition: impl Into<Bson>) -> Self {
        let mut clause = Document::new();
        clause.insert(field, condition.into());
        self.predicate = merge_predicates(self.predicate, clause);
        self
    }

    pub fn order_by(mut self, sort: Document) -> Self {
        self.sort = Some(sort);
        self
    }

    /// Add default sorting if no order is specified.
    pub fn default_order(mut self) -> Self {
        if self.sort.is_none() {
            let mut sort = Document::new();
            sort.insert(E::DEFAULT_SORT, E::DEFAULT_SORT_DIR);
            self.sort = Some(sort);
        }
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.skip = Some(offset);
        self
    }

    /// The predicate sent to the store
    pub fn predicate(&self) -> &Document {
        &self.predicate
    }

    fn find_options(&self) -> FindOptions {
        FindOptions {
            sort: self.sort.clone(),
            skip: self.skip,
            limit: self.limit,
        }
    }

    /// Execute the query and return all matching entities.
    pub async fn fetch_all<S: DocumentStore>(
        self,
        store: &S,
    ) -> Result<Vec<E>, QueryError<S::Error>> {
        tracing::debug!(collection = E::COLLECTION, predicate = %self.predicate, "Executing entity query");
        let options = self.find_options();
        let documents = store
            .find(E::COLLECTION, self.predicate, options)
            .await
            .map_err(QueryError::Storage)?;
        decode_all(documents)
    }

    /// Execute the query and return a single entity.
    pub async fn fetch_one<S: DocumentStore>(
        self,
        store: &S,
    ) -> Result<Option<E>, QueryError<S::Error>> {
        let mut items = self.limit(1).fetch_all(store).await?;
        Ok(items.pop())
    }

    /// Count matching documents, ignoring skip and limit.
    pub async fn count<S: DocumentStore>(&self, store: &S) -> Result<i64, QueryError<S::Error>> {
        tracing::debug!(collection = E::COLLECTION, predicate = %self.predicate, "Executing count query");
        let total = store
            .count_documents(E::COLLECTION, self.predicate.clone())
            .await
            .map_err(QueryError::Storage)?;
        Ok(clamp_count(total))
    }

    /// Execute as one offset page. Count and find run concurrently.
    pub async fn fetch_page<S: DocumentStore>(
        self,
        store: &S,
        page: i64,
        limit: i64,
    ) -> Result<Pagination<E>, QueryError<S::Error>> {
        let offset = get_offset(Some(page), limit);
        let mut query = self.default_order();
        query.skip = Some(offset.max(0) as u64);
        query.limit = Some(limit);

        tracing::debug!(
            collection = E::COLLECTION,
            predicate = %query.predicate,
            page,
            limit,
            offset,
            "Executing page query"
        );

        let (total, documents) = futures::try_join!(
            store.count_documents(E::COLLECTION, query.predicate.clone()),
            store.find(E::COLLECTION, query.predicate.clone(), query.find_options()),
        )
        .map_err(QueryError::Storage)?;

        let items = decode_all::<E, S::Error>(documents)?;
        Ok(offset_page(items, clamp_count(total), page, limit, offset))
    }

    /// Execute as a cursor connection of at most `first` items after `after`.
    ///
    /// The cursor bound applies to the find only; `totalCount` covers the whole
    /// filtered set.
    pub async fn fetch_connection<S: DocumentStore>(
        self,
        store: &S,
        first: i64,
        after: Option<&str>,
    ) -> Result<Connection<E>, QueryError<S::Error>> {
        let (items, total) = self.fetch_after(store, first, after, first).await?;
        Ok(cursor_page(items, total, first, E::cursor))
    }

    /// Like [`Self::fetch_connection`], but reads one extra row so `hasNextPage`
    /// is exact.
    pub async fn fetch_connection_exact<S: DocumentStore>(
        self,
        store: &S,
        first: i64,
        after: Option<&str>,
    ) -> Result<Connection<E>, QueryError<S::Error>> {
        let (items, total) = self.fetch_after(store, first, after, first + 1).await?;
        Ok(cursor_page_exact(items, total, first, E::cursor))
    }

    async fn fetch_after<S: DocumentStore>(
        self,
        store: &S,
        first: i64,
        after: Option<&str>,
        read: i64,
    ) -> Result<(Vec<E>, i64), QueryError<S::Error>> {
        let mut query = self.default_order();
        query.limit = Some(read);

        let count_predicate = query.predicate.clone();
        let find_predicate = match after {
            Some(cursor) => {
                let bound = parse_object_id(cursor)?;
                let mut clause = Document::new();
                clause.insert(ID_FIELD, doc! { "$lt": bound });
                merge_predicates(query.predicate.clone(), clause)
            }
            None => query.predicate.clone(),
        };

        tracing::debug!(
            collection = E::COLLECTION,
            predicate = %find_predicate,
            first,
            after = after.unwrap_or_default(),
            "Executing connection query"
        );

        let (total, documents) = futures::try_join!(
            store.count_documents(E::COLLECTION, count_predicate),
            store.find(E::COLLECTION, find_predicate, query.find_options()),
        )
        .map_err(QueryError::Storage)?;

        let items = decode_all::<E, S::Error>(documents)?;
        Ok((items, clamp_count(total)))
    }
}

impl<E: DocumentEntity> Default for EntityQuery<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_all<E: DocumentEntity, X: std::error::Error + 'static>(
    documents: Vec<Document>,
) -> Result<Vec<E>, QueryError<X>> {
    documents
        .into_iter()
        .map(|document| {
            bson::from_document(document).map_err(|source| QueryError::Decode {
                collection: E::COLLECTION,
                source,
            })
        })
        .collect()
}

fn clamp_count(total: u64) -> i64 {
    i64::try_from(total).unwrap_or(i64::MAX)
}

/// Conjoin `extra` onto `base`.
///
/// New keys are inserted as-is. A key already present with a different condition
/// is added to `$and` instead of replacing it, so neither side can override the
/// other. `$and` clauses are appended.
pub fn merge_predicates(mut base: Document, extra: Document) -> Document {
    for (key, value) in extra {
        if key == "$and" {
            match value {
                Bson::Array(clauses) => append_and(&mut base, clauses),
                other => append_and(&mut base, vec![other]),
            }
            continue;
        }

        match base.get(&key) {
            None => {
                base.insert(key, value);
            }
            Some(existing) if *existing == value => {}
            Some(_) => {
                let mut clause = Document::new();
                clause.insert(key, value);
                append_and(&mut base, vec![Bson::Document(clause)]);
            }
        }
    }
    base
}

fn append_and(target: &mut Document, clauses: Vec<Bson>) {
    if clauses.is_empty() {
        return;
    }
    match target.get_mut("$and") {
        Some(Bson::Array(existing)) => existing.extend(clauses),
        _ => {
            target.insert("$and", clauses);
        }
    }
}
