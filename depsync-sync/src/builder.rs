//! Turns a [`Feature`] into the field map of its remote row.
//!
//! Scalars are copied as-is; timestamps become RFC 3339 text with
//! millisecond precision, matching what the store echoes back. Links are
//! resolved against the cache, which must already hold the post-creation
//! state of every referenced kind.

use chrono::{DateTime, SecondsFormat, Utc};

use depsync_core::{ExternalId, RemoteId, TableKind};

use crate::cache::RemoteCache;
use crate::error::BuildError;
use crate::feature::Feature;
use crate::record::{FieldValue, RecordFields, EXTERNAL_ID_FIELD};

/// Build the synchronized fields of `feature`.
///
/// Fails with the first link whose target has no remote row yet.
pub fn build_record(feature: &Feature, cache: &RemoteCache) -> Result<RecordFields, BuildError> {
    let b = FieldsBuilder::new(feature, cache);
    let fields = match feature {
        Feature::Provider(f) => b.text("URL", &f.url).text("Driver", &f.driver).finish(),

        Feature::Account(f) => b
            .text("URL", &f.url)
            .text("Login", &f.login)
            .text("Full Name", &f.full_name)
            .text("Type", &f.account_type)
            .text("Location", &f.location)
            .text("Company", &f.company)
            .text("Avatar URL", &f.avatar_url)
            .link("Provider", TableKind::Provider, &f.provider)?
            .finish(),

        Feature::Repository(f) => b
            .text("URL", &f.url)
            .text("Title", &f.title)
            .text("Description", &f.description)
            .text("Homepage", &f.homepage)
            .flag("Is Fork", f.is_fork)
            .time("Created At", f.created_at)
            .time("Updated At", f.updated_at)
            .link("Provider", TableKind::Provider, &f.provider)?
            .opt_link("Owner", TableKind::Account, f.owner.as_ref())?
            .finish(),

        Feature::Label(f) => b
            .text("URL", &f.url)
            .text("Name", &f.name)
            .text("Color", &f.color)
            .text("Description", &f.description)
            .link("Repository", TableKind::Repository, &f.repository)?
            .finish(),

        Feature::Milestone(f) => b
            .text("URL", &f.url)
            .text("Title", &f.title)
            .text("Description", &f.description)
            .time("Due On", f.due_on)
            .time("Closed At", f.closed_at)
            .link("Repository", TableKind::Repository, &f.repository)?
            .opt_link("Creator", TableKind::Account, f.creator.as_ref())?
            .finish(),

        Feature::Issue(f) => b
            .text("URL", &f.url)
            .text("Title", &f.title)
            .text("Body", &f.body)
            .text("State", &f.state)
            .flag("Is PR", f.is_pr)
            .flag("Is Locked", f.is_locked)
            .int("Comments", i64::from(f.comments))
            .time("Created At", f.created_at)
            .time("Updated At", f.updated_at)
            .time("Completed At", f.completed_at)
            .link("Provider", TableKind::Provider, &f.provider)?
            .link("Repository", TableKind::Repository, &f.repository)?
            .opt_link("Milestone", TableKind::Milestone, f.milestone.as_ref())?
            .link("Author", TableKind::Account, &f.author)?
            .links("Labels", TableKind::Label, &f.labels)?
            .links("Assignees", TableKind::Account, &f.assignees)?
            .finish(),
    };
    Ok(fields)
}

struct FieldsBuilder<'a> {
    cache: &'a RemoteCache,
    from: TableKind,
    from_id: &'a ExternalId,
    fields: RecordFields,
}

impl<'a> FieldsBuilder<'a> {
    fn new(feature: &'a Feature, cache: &'a RemoteCache) -> Self {
        let mut fields = RecordFields::new();
        fields.insert(
            EXTERNAL_ID_FIELD.to_string(),
            FieldValue::Text(feature.external_id().0.clone()),
        );
        Self {
            cache,
            from: feature.kind(),
            from_id: feature.external_id(),
            fields,
        }
    }

    fn set(mut self, name: &str, value: FieldValue) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    fn text(self, name: &str, value: &str) -> Self {
        self.set(name, FieldValue::Text(value.to_string()))
    }

    fn flag(self, name: &str, value: bool) -> Self {
        self.set(name, FieldValue::Bool(value))
    }

    fn int(self, name: &str, value: i64) -> Self {
        self.set(name, FieldValue::Int(value))
    }

    fn time(self, name: &str, value: Option<DateTime<Utc>>) -> Self {
        let value = match value {
            Some(t) => FieldValue::Text(t.to_rfc3339_opts(SecondsFormat::Millis, true)),
            None => FieldValue::Null,
        };
        self.set(name, value)
    }

    fn resolve(&self, kind: TableKind, ext: &ExternalId) -> Result<RemoteId, BuildError> {
        debug_assert!(
            self.from.dependencies().contains(&kind),
            "{} may not link to {kind}",
            self.from
        );
        self.cache.resolve(kind, ext).cloned().ok_or_else(|| BuildError {
            from: self.from,
            from_id: self.from_id.clone(),
            kind,
            external_id: ext.clone(),
        })
    }

    fn link(self, name: &str, kind: TableKind, ext: &ExternalId) -> Result<Self, BuildError> {
        let id = self.resolve(kind, ext)?;
        Ok(self.set(name, FieldValue::Links(vec![id])))
    }

    fn opt_link(
        self,
        name: &str,
        kind: TableKind,
        ext: Option<&ExternalId>,
    ) -> Result<Self, BuildError> {
        match ext {
            Some(ext) => self.link(name, kind, ext),
            None => Ok(self.set(name, FieldValue::Links(Vec::new()))),
        }
    }

    fn links(self, name: &str, kind: TableKind, exts: &[ExternalId]) -> Result<Self, BuildError> {
        let ids = exts
            .iter()
            .map(|ext| self.resolve(kind, ext))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(self.set(name, FieldValue::Links(ids)))
    }

    fn finish(self) -> RecordFields {
        self.fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::RemoteTable;
    use crate::feature::{AccountFeature, IssueFeature, ProviderFeature};
    use crate::record::RemoteRecord;
    use chrono::TimeZone;

    fn row(id: &str, ext: &str) -> RemoteRecord {
        RemoteRecord::fetched(
            id.into(),
            RecordFields::from([(EXTERNAL_ID_FIELD.to_string(), FieldValue::from(ext))]),
        )
    }

    fn cache_with(kind: TableKind, rows: Vec<RemoteRecord>) -> RemoteCache {
        let mut cache = RemoteCache::new();
        for k in TableKind::all() {
            cache.insert(RemoteTable::empty(*k, k.to_string()));
        }
        cache.insert(RemoteTable::new(kind, kind.to_string(), rows));
        cache
    }

    fn alice() -> Feature {
        Feature::Account(AccountFeature {
            id: "ext-42".into(),
            url: "https://github.com/alice".to_string(),
            login: "alice".to_string(),
            full_name: String::new(),
            account_type: "user".to_string(),
            location: String::new(),
            company: String::new(),
            avatar_url: String::new(),
            provider: "gh".into(),
        })
    }

    #[test]
    fn scalars_are_copied_and_id_is_set() {
        let feature = Feature::Provider(ProviderFeature {
            id: "gh".into(),
            url: "https://github.com".to_string(),
            driver: "github".to_string(),
        });
        let fields = build_record(&feature, &RemoteCache::new()).expect("build");
        assert_eq!(fields["ID"], FieldValue::from("gh"));
        assert_eq!(fields["Driver"], FieldValue::from("github"));
        assert_eq!(fields.len(), 3);
    }

    #[test]
    fn links_resolve_to_remote_ids() {
        let cache = cache_with(TableKind::Provider, vec![row("recGH", "gh")]);
        let fields = build_record(&alice(), &cache).expect("build");
        assert_eq!(fields["Provider"], FieldValue::Links(vec!["recGH".into()]));
        assert_eq!(fields["Login"], FieldValue::from("alice"));
    }

    #[test]
    fn missing_link_target_names_kind_and_id() {
        let cache = cache_with(TableKind::Provider, vec![]);
        let err = build_record(&alice(), &cache).unwrap_err();
        assert_eq!(err.kind, TableKind::Provider);
        assert_eq!(err.external_id, ExternalId::from("gh"));
        assert_eq!(err.from, TableKind::Account);
        assert!(err.to_string().contains("provider 'gh'"));
    }

    #[test]
    fn issue_links_and_timestamps() {
        let mut cache = cache_with(TableKind::Provider, vec![row("recP", "gh")]);
        cache.insert(RemoteTable::new(
            TableKind::Repository,
            "Repositories",
            vec![row("recR", "repo")],
        ));
        cache.insert(RemoteTable::new(
            TableKind::Account,
            "Accounts",
            vec![row("recA", "alice"), row("recB", "bob")],
        ));
        cache.insert(RemoteTable::new(
            TableKind::Label,
            "Labels",
            vec![row("recL", "bug")],
        ));

        let issue = Feature::Issue(IssueFeature {
            id: "issue-1".into(),
            url: "https://github.com/moul/depviz/issues/1".to_string(),
            title: "t".to_string(),
            body: String::new(),
            state: "open".to_string(),
            is_pr: false,
            is_locked: false,
            comments: 2,
            created_at: Some(Utc.with_ymd_and_hms(2026, 9, 1, 10, 0, 0).unwrap()),
            updated_at: None,
            completed_at: None,
            provider: "gh".into(),
            repository: "repo".into(),
            milestone: None,
            author: "alice".into(),
            labels: vec!["bug".into()],
            assignees: vec!["bob".into(), "alice".into()],
        });
        let fields = build_record(&issue, &cache).expect("build");
        assert_eq!(fields["Repository"], FieldValue::Links(vec!["recR".into()]));
        assert_eq!(fields["Milestone"], FieldValue::Links(vec![]));
        assert_eq!(
            fields["Assignees"],
            FieldValue::Links(vec!["recB".into(), "recA".into()])
        );
        assert_eq!(fields["Comments"], FieldValue::Int(2));
        assert_eq!(fields["Created At"], FieldValue::from("2026-09-01T10:00:00.000Z"));
        assert_eq!(fields["Updated At"], FieldValue::Null);
    }
}
