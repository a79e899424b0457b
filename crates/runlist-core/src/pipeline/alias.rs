use super::domain::AuctionId;
use super::repository::{AliasStore, RepositoryError};

/// Two-tier make/model normalization over administrator-maintained alias
/// rows. Lookups try the auction-scoped tier first, then the general tier,
/// and otherwise return the input unchanged.
///
/// Resolution is deliberately single-hop: the canonical value coming out of
/// an alias row is never re-resolved, so alias tables must point directly at
/// the true canonical name.
pub struct AliasResolver<'a, S: AliasStore> {
    store: &'a S,
}

impl<'a, S: AliasStore> AliasResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn normalize_make(
        &self,
        make: &str,
        scope: Option<&AuctionId>,
    ) -> Result<String, RepositoryError> {
        if let Some(auction) = scope {
            if let Some(canonical) = self.store.canonical_make(make, Some(auction))? {
                return Ok(canonical);
            }
        }

        if let Some(canonical) = self.store.canonical_make(make, None)? {
            return Ok(canonical);
        }

        Ok(make.to_string())
    }

    /// Normalizes the make first, then resolves the model under the
    /// canonical make with the same two-tier rule.
    pub fn normalize_model(
        &self,
        make: &str,
        model: &str,
        scope: Option<&AuctionId>,
    ) -> Result<(String, String), RepositoryError> {
        let canonical_make = self.normalize_make(make, scope)?;

        if let Some(auction) = scope {
            if let Some(canonical) =
                self.store
                    .canonical_model(&canonical_make, model, Some(auction))?
            {
                return Ok((canonical_make, canonical));
            }
        }

        if let Some(canonical) = self.store.canonical_model(&canonical_make, model, None)? {
            return Ok((canonical_make, canonical));
        }

        Ok((canonical_make, model.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::repository::{MakeAlias, ModelAlias};

    #[derive(Default)]
    struct TableAliasStore {
        makes: Vec<MakeAlias>,
        models: Vec<ModelAlias>,
    }

    impl AliasStore for TableAliasStore {
        fn canonical_make(
            &self,
            alias: &str,
            scope: Option<&AuctionId>,
        ) -> Result<Option<String>, RepositoryError> {
            Ok(self
                .makes
                .iter()
                .find(|row| row.alias == alias && row.scope.as_ref() == scope)
                .map(|row| row.canonical.clone()))
        }

        fn canonical_model(
            &self,
            make: &str,
            alias: &str,
            scope: Option<&AuctionId>,
        ) -> Result<Option<String>, RepositoryError> {
            Ok(self
                .models
                .iter()
                .find(|row| row.make == make && row.alias == alias && row.scope.as_ref() == scope)
                .map(|row| row.canonical.clone()))
        }
    }

    fn scoped_store() -> TableAliasStore {
        TableAliasStore {
            makes: vec![
                MakeAlias {
                    alias: "Chevy".to_string(),
                    canonical: "Chevrolet".to_string(),
                    scope: Some(AuctionId("A".to_string())),
                },
                MakeAlias {
                    alias: "VW".to_string(),
                    canonical: "Volkswagen".to_string(),
                    scope: None,
                },
            ],
            models: vec![ModelAlias {
                make: "Chevrolet".to_string(),
                alias: "Silverado 1500".to_string(),
                canonical: "Silverado".to_string(),
                scope: None,
            }],
        }
    }

    #[test]
    fn scoped_alias_beats_absence_in_other_scopes() {
        let store = scoped_store();
        let resolver = AliasResolver::new(&store);
        let scope_a = AuctionId("A".to_string());
        let scope_b = AuctionId("B".to_string());

        assert_eq!(
            resolver.normalize_make("Chevy", Some(&scope_a)).unwrap(),
            "Chevrolet"
        );
        assert_eq!(
            resolver.normalize_make("Chevy", Some(&scope_b)).unwrap(),
            "Chevy",
            "scope B has no alias row and no general row exists"
        );
    }

    #[test]
    fn general_tier_is_the_fallback() {
        let store = scoped_store();
        let resolver = AliasResolver::new(&store);
        let scope_b = AuctionId("B".to_string());

        assert_eq!(
            resolver.normalize_make("VW", Some(&scope_b)).unwrap(),
            "Volkswagen"
        );
        assert_eq!(resolver.normalize_make("VW", None).unwrap(), "Volkswagen");
    }

    #[test]
    fn unknown_input_passes_through_unchanged() {
        let store = scoped_store();
        let resolver = AliasResolver::new(&store);
        assert_eq!(resolver.normalize_make("Rivian", None).unwrap(), "Rivian");
    }

    #[test]
    fn model_lookup_uses_the_canonical_make() {
        let store = scoped_store();
        let resolver = AliasResolver::new(&store);
        let scope_a = AuctionId("A".to_string());

        let (make, model) = resolver
            .normalize_model("Chevy", "Silverado 1500", Some(&scope_a))
            .unwrap();
        assert_eq!(make, "Chevrolet");
        assert_eq!(model, "Silverado");
    }

    #[test]
    fn normalization_is_idempotent() {
        let store = scoped_store();
        let resolver = AliasResolver::new(&store);
        let scope_a = AuctionId("A".to_string());

        for input in ["Chevy", "Chevrolet", "VW", "Rivian"] {
            let once = resolver.normalize_make(input, Some(&scope_a)).unwrap();
            let twice = resolver.normalize_make(&once, Some(&scope_a)).unwrap();
            assert_eq!(once, twice, "idempotence broken for '{input}'");
        }
    }

    #[test]
    fn resolution_never_chains_hops() {
        let mut store = scoped_store();
        // A mis-maintained second-hop row: the canonical value of "Chevy" is
        // itself an alias elsewhere. A single resolution must not follow it.
        store.makes.push(MakeAlias {
            alias: "Chevrolet".to_string(),
            canonical: "General Motors".to_string(),
            scope: None,
        });
        let resolver = AliasResolver::new(&store);
        let scope_a = AuctionId("A".to_string());

        assert_eq!(
            resolver.normalize_make("Chevy", Some(&scope_a)).unwrap(),
            "Chevrolet"
        );
    }
}
