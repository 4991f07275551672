//! Integration tests: whole-catalog checks built with `CatalogBuilder`.
//!
//! Every test starts from the same small plant catalog (a local area owned by
//! `kv.plant`, a remote area owned by `kv.remote`) and adds exactly the defect
//! under test, so a clean baseline plus one finding class is the expectation.

use cfgcat_check::{
    CancelToken, CheckConfig, ConsistencyCheckResult, ConsistencyChecker,
    KindOfConsistencyCheck, Severity, dataset_entry, finding_class, run_consistency_check,
};
use cfgcat_model::deserialize::serialize_record;
use cfgcat_model::{
    AreaDependency, AreaVersions, AttributeTypeSpec, Catalog, CatalogBuilder, Data,
    DependencyKind, DependencyRecord, IntegerRange, IntegerState, MetaTypes, NOT_VALID, ObjectId,
    ObjectKind, ObjectStore, PersistenceMode, ReferenceType, SetElement, SetTypeSpec,
    SystemObject, TypeSpec, Usage, Validity, Version, pids,
};
use std::collections::{BTreeMap, BTreeSet};

fn versions(active: Version) -> AreaVersions {
    AreaVersions {
        active,
        modifiable: active + 1,
        transferable: active,
        activatable: active,
    }
}

struct Plant {
    builder: CatalogBuilder,
    meta: MetaTypes,
    area: ObjectId,
    remote: ObjectId,
    thing: ObjectId,
}

fn plant() -> Plant {
    let mut builder = CatalogBuilder::new();
    let meta = builder.meta();
    let authority = builder.authority(meta.area, "kv.plant");
    let remote_authority = builder.authority(meta.area, "kv.remote");
    let area = builder.area("kb.plant", authority, versions(1));
    let remote = builder.area("kb.remote", remote_authority, versions(1));
    let thing = builder.object_type(
        area,
        "typ.thing",
        TypeSpec {
            configuring: true,
            ..TypeSpec::default()
        },
    );
    Plant {
        builder,
        meta,
        area,
        remote,
        thing,
    }
}

impl Plant {
    fn build(self) -> ObjectStore {
        self.builder.build().expect("catalog builds")
    }

    fn set_type(&mut self, pid: &str, minimum: u32, maximum: u32, reference: ReferenceType) -> ObjectId {
        self.builder.set_type(
            self.area,
            pid,
            SetTypeSpec {
                object_types: vec![self.thing],
                minimum,
                maximum,
                mutable: false,
                reference,
            },
        )
    }

    /// Holder type with a required set `parts` of `set_type`.
    fn holder_type(&mut self, pid: &str, set_type: ObjectId) -> ObjectId {
        let holder = self.builder.object_type(self.area, pid, TypeSpec::default());
        self.builder.set_use(self.area, holder, "parts", set_type, true);
        holder
    }

    fn things(&mut self, area: ObjectId, prefix: &str, count: usize) -> Vec<ObjectId> {
        (0..count)
            .map(|index| {
                self.builder
                    .object(area, &format!("{prefix}.{index}"), self.thing)
            })
            .collect()
    }

    /// Group `atg.link` with one reference attribute `target` on type `typ.linker`.
    fn linker(&mut self, reference: ReferenceType, undefined_allowed: bool) -> (ObjectId, ObjectId) {
        let area = self.area;
        let link_type = self.builder.attribute_type(
            area,
            "att.thingReference",
            AttributeTypeSpec::Reference {
                target_type: Some(self.thing),
                reference,
                undefined_allowed,
            },
        );
        let target = self.builder.attribute(area, "target", 1, link_type);
        let group = self.builder.attribute_group(area, "atg.link", vec![target]);
        let aspect = self.builder.aspect(area, "asp.link");
        let usage = self
            .builder
            .usage(area, group, aspect, Usage::RequiredConfigurationData);
        let linker = self.builder.object_type(
            area,
            "typ.linker",
            TypeSpec {
                attribute_groups: vec![group],
                ..TypeSpec::default()
            },
        );
        (linker, usage)
    }

    fn link(&mut self, linker: ObjectId, usage: ObjectId, pid: &str, target: ObjectId) -> ObjectId {
        let source = self.builder.object(self.area, pid, linker);
        self.builder
            .set_data(source, usage, Data::record([("target", Data::Reference(target))]));
        source
    }
}

fn local_config() -> CheckConfig {
    CheckConfig {
        local_authority: Some("kv.plant".to_string()),
        ..CheckConfig::default()
    }
}

fn check(store: &ObjectStore, pins: &[(ObjectId, Version)]) -> ConsistencyCheckResult {
    check_with(store, pins, CheckConfig::default())
}

fn check_with(
    store: &ObjectStore,
    pins: &[(ObjectId, Version)],
    config: CheckConfig,
) -> ConsistencyCheckResult {
    ConsistencyChecker::new(store, config)
        .check(pins, KindOfConsistencyCheck::ConsistencyCheck)
        .result
}

fn summary(result: &ConsistencyCheckResult) -> Vec<(Severity, String)> {
    result
        .findings
        .iter()
        .map(|finding| (finding.severity, finding.class.clone()))
        .collect()
}

fn assert_clean(result: &ConsistencyCheckResult) {
    assert!(
        result.findings.is_empty(),
        "expected no findings, got:\n{}",
        result
            .findings
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("\n")
    );
}

fn null_entry() -> SetElement {
    SetElement {
        object: None,
        valid_since: 1,
        not_valid_since: NOT_VALID,
    }
}

#[test]
fn fresh_plant_catalog_is_clean() {
    let store = plant().build();
    let result = check(&store, &[]);
    assert_clean(&result);
    assert!(result.stats.objects_checked > 0);
    assert_eq!(result.stats.areas_checked, 3);
}

#[test]
fn set_cardinality_is_enforced_at_both_bounds() {
    for (members, expected) in [(1, 1), (2, 0), (3, 0), (4, 1)] {
        let mut p = plant();
        let parts = p.set_type("mt.parts", 2, 3, ReferenceType::Aggregation);
        let holder_type = p.holder_type("typ.holder", parts);
        let holder = p.builder.object(p.area, "obj.holder", holder_type);
        let members = p.things(p.area, "obj.part", members);
        p.builder.object_set(p.area, holder, parts, "parts", &members);
        let result = check(&p.build(), &[]);

        assert_eq!(
            result.count_class(finding_class::SET_CARDINALITY),
            expected,
            "{} member(s)",
            members.len()
        );
        assert_eq!(result.findings.len(), expected);
        assert!(result.findings.iter().all(|f| f.severity == Severity::LocalError));
    }
}

#[test]
fn unbounded_maximum_only_checks_minimum() {
    let mut p = plant();
    let parts = p.set_type("mt.parts", 1, 0, ReferenceType::Aggregation);
    let holder_type = p.holder_type("typ.holder", parts);
    let holder = p.builder.object(p.area, "obj.holder", holder_type);
    let members = p.things(p.area, "obj.part", 12);
    p.builder.object_set(p.area, holder, parts, "parts", &members);
    assert_clean(&check(&p.build(), &[]));
}

#[test]
fn undeclared_and_missing_required_sets_are_local_errors() {
    let mut p = plant();
    let parts = p.set_type("mt.parts", 0, 0, ReferenceType::Aggregation);
    let holder_type = p.holder_type("typ.holder", parts);
    let holder = p.builder.object(p.area, "obj.holder", holder_type);
    p.builder.object_set(p.area, holder, parts, "extras", &[]);
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![
            (Severity::LocalError, finding_class::SET_UNDECLARED.to_string()),
            (Severity::LocalError, finding_class::SET_REQUIRED_MISSING.to_string()),
        ]
    );
}

#[test]
fn set_elements_must_have_an_allowed_type() {
    let mut p = plant();
    let parts = p.set_type("mt.parts", 0, 0, ReferenceType::Aggregation);
    let holder_type = p.holder_type("typ.holder", parts);
    let holder = p.builder.object(p.area, "obj.holder", holder_type);
    let stranger_type = p.builder.object_type(p.area, "typ.stranger", TypeSpec::default());
    let stranger = p.builder.object(p.area, "obj.stranger", stranger_type);
    p.builder.object_set(p.area, holder, parts, "parts", &[stranger]);
    let result = check(&p.build(), &[]);

    assert_eq!(result.count_class(finding_class::SET_ELEMENT_TYPE), 1);
    assert_eq!(result.findings.len(), 1);
}

#[test]
fn subtypes_are_allowed_set_elements() {
    let mut p = plant();
    let parts = p.set_type("mt.parts", 0, 0, ReferenceType::Aggregation);
    let holder_type = p.holder_type("typ.holder", parts);
    let holder = p.builder.object(p.area, "obj.holder", holder_type);
    let gadget_type = p.builder.object_type(
        p.area,
        "typ.gadget",
        TypeSpec {
            super_types: vec![p.thing],
            ..TypeSpec::default()
        },
    );
    let gadget = p.builder.object(p.area, "obj.gadget", gadget_type);
    p.builder.object_set(p.area, holder, parts, "parts", &[gadget]);
    assert_clean(&check(&p.build(), &[]));
}

#[test]
fn null_set_entry_is_fixable_and_clears_after_fix() {
    let mut p = plant();
    let parts = p.set_type("mt.parts", 0, 0, ReferenceType::Aggregation);
    let holder_type = p.holder_type("typ.holder", parts);
    let holder = p.builder.object(p.area, "obj.holder", holder_type);
    let members = p.things(p.area, "obj.part", 2);
    let set = p.builder.object_set(p.area, holder, parts, "parts", &members);
    p.builder.modify(set, |object| {
        if let ObjectKind::ObjectSet(spec) = &mut object.kind {
            spec.elements.push(null_entry());
        }
    });
    let mut store = p.build();

    let result = check(&store, &[]);
    assert_eq!(summary(&result), vec![(
        Severity::LocalError,
        finding_class::SET_NULL_ELEMENT.to_string()
    )]);
    let fixes: Vec<_> = result.fixables().filter_map(|f| f.fix.clone()).collect();
    assert_eq!(fixes.len(), 1);

    for fix in &fixes {
        cfgcat_model::CatalogWriter::apply_fix(&mut store, fix).expect("fix applies");
    }
    assert_clean(&check(&store, &[]));
}

#[test]
fn composed_objects_have_exactly_one_owner() {
    let mut p = plant();
    let parts = p.set_type("mt.parts", 0, 0, ReferenceType::Composition);
    let holder_type = p.holder_type("typ.holder", parts);
    let shared = p.things(p.area, "obj.part", 1);
    let first = p.builder.object(p.area, "obj.first", holder_type);
    let second = p.builder.object(p.area, "obj.second", holder_type);
    p.builder.object_set(p.area, first, parts, "parts", &shared);
    p.builder.object_set(p.area, second, parts, "parts", &shared);
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![(
            Severity::LocalError,
            finding_class::COMPOSITION_MULTIPLE_OWNERS.to_string()
        )]
    );
    let finding = &result.findings[0];
    let named: Vec<ObjectId> = finding.objects.iter().map(|object| object.id).collect();
    assert_eq!(named, vec![shared[0], first, second]);
}

#[test]
fn composition_stays_inside_the_area_and_excludes_dynamic_objects() {
    let mut p = plant();
    let parts = p.set_type("mt.parts", 0, 0, ReferenceType::Composition);
    let holder_type = p.holder_type("typ.holder", parts);
    let holder = p.builder.object(p.area, "obj.holder", holder_type);
    let foreign = p.things(p.remote, "obj.foreign", 1);
    let created = chrono::DateTime::from_timestamp(1_000, 0).expect("timestamp");
    let dynamic = p
        .builder
        .dynamic_object(p.area, "dyn.part", p.thing, created, false);
    p.builder
        .object_set(p.area, holder, parts, "parts", &[foreign[0], dynamic]);
    let result = check(&p.build(), &[]);

    assert_eq!(result.count_class(finding_class::COMPOSITION_FOREIGN_AREA), 1);
    assert_eq!(result.count_class(finding_class::COMPOSITION_DYNAMIC_ELEMENT), 1);
    assert_eq!(result.findings.len(), 2);
}

#[test]
fn duplicate_pid_within_an_area_is_a_local_error() {
    let mut p = plant();
    p.builder.object(p.area, "obj.twin", p.thing);
    p.builder.object(p.area, "obj.twin", p.thing);
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![(
            Severity::LocalError,
            finding_class::PID_DUPLICATE_IN_AREA.to_string()
        )]
    );
}

#[test]
fn duplicate_pid_across_areas_follows_the_policy_flag() {
    let store = {
        let mut p = plant();
        p.builder.object(p.area, "obj.twin", p.thing);
        p.builder.object(p.remote, "obj.twin", p.thing);
        p.build()
    };

    let tolerated = check(&store, &[]);
    assert_eq!(
        summary(&tolerated),
        vec![(
            Severity::Warning,
            finding_class::PID_DUPLICATE_ACROSS_AREAS.to_string()
        )]
    );

    let strict = check_with(
        &store,
        &[],
        CheckConfig {
            allow_double_pids: false,
            ..CheckConfig::default()
        },
    );
    assert_eq!(
        summary(&strict),
        vec![(
            Severity::InterferenceError,
            finding_class::PID_DUPLICATE_ACROSS_AREAS.to_string()
        )]
    );
}

#[test]
fn reused_id_is_a_local_error() {
    let mut p = plant();
    let original = p.builder.object(p.area, "obj.original", p.thing);
    p.builder.insert(SystemObject {
        id: original,
        pid: "obj.impostor".to_string(),
        name: String::new(),
        type_id: p.thing,
        area_id: p.remote,
        validity: Validity::Configuration {
            valid_since: 1,
            not_valid_since: NOT_VALID,
        },
        sets: Vec::new(),
        data: BTreeMap::new(),
        kind: ObjectKind::Plain,
    });
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![(Severity::LocalError, finding_class::ID_DUPLICATE.to_string())]
    );
}

#[test]
fn attribute_positions_must_run_without_gaps_or_repeats() {
    let mut p = plant();
    let text = p
        .builder
        .attribute_type(p.area, "att.text", AttributeTypeSpec::Text);
    let first = p.builder.attribute(p.area, "first", 1, text);
    let third = p.builder.attribute(p.area, "third", 3, text);
    p.builder.attribute_group(p.area, "atg.gappy", vec![first, third]);
    let one = p.builder.attribute(p.area, "one", 1, text);
    let again = p.builder.attribute(p.area, "again", 1, text);
    p.builder.attribute_group(p.area, "atg.repeated", vec![one, again]);
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![
            (Severity::LocalError, finding_class::ATTRIBUTE_POSITION_GAP.to_string()),
            (
                Severity::LocalError,
                finding_class::ATTRIBUTE_POSITION_DUPLICATE.to_string()
            ),
        ]
    );
}

#[test]
fn attribute_without_default_or_undefined_value_is_rejected() {
    let mut p = plant();
    let float = p
        .builder
        .attribute_type(p.area, "att.float", AttributeTypeSpec::Float);
    let value = p.builder.attribute(p.area, "value", 1, float);
    p.builder.attribute_group(p.area, "atg.measure", vec![value]);
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![(Severity::LocalError, finding_class::ATTRIBUTE_NO_DEFAULT.to_string())]
    );
}

#[test]
fn duplicate_integer_states_are_warnings() {
    let mut p = plant();
    let state = |name: &str, value: i64| IntegerState {
        name: name.to_string(),
        value,
    };
    p.builder.attribute_type(
        p.area,
        "att.mode",
        AttributeTypeSpec::Integer {
            byte_count: 4,
            range: None,
            states: vec![state("a", 1), state("a", 1)],
        },
    );
    p.builder.attribute_type(
        p.area,
        "att.level",
        AttributeTypeSpec::Integer {
            byte_count: 4,
            range: None,
            states: vec![state("low", 1), state("high", 1)],
        },
    );
    let result = check(&p.build(), &[]);

    let mut found = summary(&result);
    found.sort();
    assert_eq!(
        found,
        vec![
            (
                Severity::Warning,
                finding_class::INTEGER_STATE_NAME_DUPLICATE.to_string()
            ),
            (
                Severity::Warning,
                finding_class::INTEGER_STATE_VALUE_DUPLICATE.to_string()
            ),
            (
                Severity::Warning,
                finding_class::INTEGER_STATE_VALUE_DUPLICATE.to_string()
            ),
        ]
    );
}

/// Areas named by the dependency record persisted for `area`.
fn persisted_dependency_areas(store: &ObjectStore, area: ObjectId) -> BTreeSet<ObjectId> {
    store
        .area_metadata(area)
        .expect("metadata")
        .dependencies
        .expect("dependencies persisted")
        .dependencies
        .into_iter()
        .map(|dependency| dependency.area)
        .collect()
}

#[test]
fn undefined_composition_reference_is_one_interference_error() {
    let mut p = plant();
    let (linker, usage) = p.linker(ReferenceType::Composition, false);
    p.link(linker, usage, "obj.empty", ObjectId::UNDEFINED);
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![(
            Severity::InterferenceError,
            finding_class::REFERENCE_UNDEFINED.to_string()
        )]
    );
}

#[test]
fn composed_target_in_the_same_area_records_no_area_dependency() {
    let mut p = plant();
    let (linker, usage) = p.linker(ReferenceType::Composition, false);
    let part = p.builder.object(p.area, "obj.part", p.thing);
    p.link(linker, usage, "obj.whole", part);
    let (area, meta_area) = (p.area, p.meta.area);
    let mut store = p.build();

    let result = run_consistency_check(
        &mut store,
        &[(area, 2)],
        KindOfConsistencyCheck::ReleaseForTransfer,
        &local_config(),
    );
    assert_clean(&result);
    assert!(result.dependencies_persisted);
    assert_eq!(
        persisted_dependency_areas(&store, area),
        BTreeSet::from([meta_area])
    );
}

#[test]
fn composition_references_fail_locally() {
    let mut p = plant();
    let (linker, usage) = p.linker(ReferenceType::Composition, false);
    let shared = p.builder.object(p.area, "obj.shared", p.thing);
    p.link(linker, usage, "obj.first", shared);
    p.link(linker, usage, "obj.second", shared);
    p.link(linker, usage, "obj.dangling", ObjectId(987_654));
    let result = check(&p.build(), &[]);

    let mut found = summary(&result);
    found.sort();
    assert_eq!(
        found,
        vec![
            (
                Severity::LocalError,
                finding_class::COMPOSITION_MULTIPLE_OWNERS.to_string()
            ),
            (
                Severity::LocalError,
                finding_class::REFERENCE_UNRESOLVED.to_string()
            ),
        ]
    );
}

#[test]
fn composition_reference_into_another_area_is_a_local_error() {
    let mut p = plant();
    let (linker, usage) = p.linker(ReferenceType::Composition, false);
    let foreign = p.builder.object(p.remote, "obj.foreign", p.thing);
    p.link(linker, usage, "obj.whole", foreign);
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![(
            Severity::LocalError,
            finding_class::COMPOSITION_FOREIGN_AREA.to_string()
        )]
    );
}

#[test]
fn references_to_objects_of_transient_types_record_no_dependency() {
    let mut p = plant();
    let (linker, usage) = p.linker(ReferenceType::Aggregation, false);
    let session_type = p.builder.object_type(
        p.area,
        "typ.session",
        TypeSpec {
            persistence: PersistenceMode::Transient,
            super_types: vec![p.thing],
            ..TypeSpec::default()
        },
    );
    let created = chrono::DateTime::from_timestamp(1_000, 0).expect("timestamp");
    let session = p
        .builder
        .dynamic_object(p.remote, "dyn.session", session_type, created, false);
    p.link(linker, usage, "obj.source", session);
    let (area, meta_area) = (p.area, p.meta.area);
    let mut store = p.build();

    let result = run_consistency_check(
        &mut store,
        &[(area, 2)],
        KindOfConsistencyCheck::ReleaseForTransfer,
        &local_config(),
    );
    assert_clean(&result);
    assert!(result.dependencies_persisted);
    assert_eq!(
        persisted_dependency_areas(&store, area),
        BTreeSet::from([meta_area])
    );
}

#[test]
fn valid_remote_reference_is_clean_and_becomes_a_dependency() {
    let mut p = plant();
    let (linker, usage) = p.linker(ReferenceType::Aggregation, false);
    let target = p.builder.object(p.remote, "obj.target", p.thing);
    p.link(linker, usage, "obj.source", target);
    let (area, remote, meta_area) = (p.area, p.remote, p.meta.area);
    let mut store = p.build();

    let result = run_consistency_check(
        &mut store,
        &[(area, 2)],
        KindOfConsistencyCheck::ReleaseForTransfer,
        &local_config(),
    );
    assert_clean(&result);
    assert!(result.dependencies_persisted);

    let metadata = store.area_metadata(area).expect("metadata");
    let required = |target_area: ObjectId| AreaDependency {
        dependent_version: 1,
        area: target_area,
        needed_version: 1,
        kind: DependencyKind::Required,
    };
    assert_eq!(
        metadata.dependencies,
        Some(DependencyRecord {
            version: 2,
            dependencies: BTreeSet::from([required(meta_area), required(remote)]),
        })
    );
    // Remote areas belong to another authority and record nothing.
    assert_eq!(store.area_metadata(remote).expect("metadata").dependencies, None);
}

#[test]
fn broken_references_are_classified_by_reference_kind() {
    let mut p = plant();
    let (linker, usage) = p.linker(ReferenceType::Aggregation, false);
    let retired = p.builder.object(p.remote, "obj.retired", p.thing);
    p.builder.set_validity(retired, 3, NOT_VALID);
    let stranger_type = p.builder.object_type(p.area, "typ.stranger", TypeSpec::default());
    let stranger = p.builder.object(p.area, "obj.stranger", stranger_type);
    p.link(linker, usage, "obj.undefined", ObjectId::UNDEFINED);
    p.link(linker, usage, "obj.dangling", ObjectId(987_654));
    p.link(linker, usage, "obj.invalid", retired);
    p.link(linker, usage, "obj.mistyped", stranger);
    let result = check(&p.build(), &[]);

    let mut found = summary(&result);
    found.sort();
    let mut expected = vec![
        (Severity::InterferenceError, finding_class::REFERENCE_UNDEFINED.to_string()),
        (Severity::InterferenceError, finding_class::REFERENCE_UNRESOLVED.to_string()),
        (
            Severity::InterferenceError,
            finding_class::REFERENCE_INVALID_TARGET.to_string(),
        ),
        (Severity::LocalError, finding_class::REFERENCE_WRONG_TYPE.to_string()),
    ];
    expected.sort();
    assert_eq!(found, expected);
}

#[test]
fn optional_association_to_invalid_target_is_only_a_warning() {
    let mut p = plant();
    let (linker, usage) = p.linker(ReferenceType::Association, true);
    let retired = p.builder.object(p.remote, "obj.retired", p.thing);
    p.builder.set_validity(retired, 3, NOT_VALID);
    p.link(linker, usage, "obj.source", retired);
    p.link(linker, usage, "obj.unset", ObjectId::UNDEFINED);
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![(
            Severity::Warning,
            finding_class::REFERENCE_INVALID_TARGET.to_string()
        )]
    );
}

#[test]
fn required_record_must_be_present() {
    let mut p = plant();
    let (linker, _) = p.linker(ReferenceType::Aggregation, false);
    p.builder.object(p.area, "obj.bare", linker);
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![(
            Severity::LocalError,
            finding_class::DATA_REQUIRED_MISSING.to_string()
        )]
    );
}

#[test]
fn record_under_foreign_usage_is_interference() {
    let mut p = plant();
    let (_, usage) = p.linker(ReferenceType::Aggregation, false);
    let target = p.builder.object(p.area, "obj.target", p.thing);
    let plain = p.builder.object(p.area, "obj.plain", p.thing);
    p.builder
        .set_data(plain, usage, Data::record([("target", Data::Reference(target))]));
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![(
            Severity::InterferenceError,
            finding_class::DATA_USAGE_NOT_ALLOWED.to_string()
        )]
    );
}

/// Type `typ.logged` carrying an optional record of `group_pid` with one time attribute.
fn logged_object(p: &mut Plant, group_pid: &str, stamp: i64) {
    let area = p.area;
    let time = p.builder.attribute_type(
        area,
        &format!("att.time.{group_pid}"),
        AttributeTypeSpec::Time { relative: false },
    );
    let stamp_attr = p.builder.attribute(area, "lastModified", 1, time);
    let group = p.builder.attribute_group(area, group_pid, vec![stamp_attr]);
    let usage = p
        .builder
        .usage(area, group, p.meta.properties_aspect, Usage::OptionalConfigurationData);
    let logged = p.builder.object_type(
        area,
        &format!("typ.logged.{group_pid}"),
        TypeSpec {
            attribute_groups: vec![group],
            ..TypeSpec::default()
        },
    );
    let object = p.builder.object(area, &format!("obj.logged.{group_pid}"), logged);
    p.builder
        .set_data(object, usage, Data::record([("lastModified", Data::Time(stamp))]));
}

#[test]
fn undefined_record_is_a_local_error_except_legacy_change_information() {
    let mut p = plant();
    logged_object(&mut p, "atg.changeLog", 0);
    logged_object(&mut p, pids::ATG_AREA_CHANGE_INFORMATION, 0);
    logged_object(&mut p, "atg.stamped", 1_700_000_000_000);
    let result = check(&p.build(), &[]);

    assert_eq!(
        summary(&result),
        vec![(Severity::LocalError, finding_class::DATA_UNDEFINED.to_string())]
    );
    assert!(result.findings[0].message.contains("atg.changeLog"));
}

#[test]
fn retired_authority_is_accepted_while_a_successor_is_named() {
    let build = |successor: bool| {
        let mut p = plant();
        let registry = p
            .builder
            .area("kb.registry", p.meta.authority, versions(2));
        let old = p.builder.authority(registry, "kv.old");
        p.builder.set_validity(old, 1, 2);
        let new = p.builder.authority(registry, "kv.new");
        let named = if successor { new } else { ObjectId::UNDEFINED };
        p.builder.set_data(
            p.area,
            p.meta.area_properties_usage,
            cfgcat_model::area_properties(old, named),
        );
        p.build()
    };

    assert_clean(&check(&build(true), &[]));
    let result = check(&build(false), &[]);
    assert_eq!(
        summary(&result),
        vec![(
            Severity::InterferenceError,
            finding_class::REFERENCE_INVALID_TARGET.to_string()
        )]
    );
}

/// Parametrizing group `atg.threshold` on `typ.sensor`, plus the default
/// dataset group. Returns the sensor object, the dataset usage, the sensor
/// type and the parametrizing group.
fn sensor_fixture(p: &mut Plant) -> (ObjectId, ObjectId, ObjectId, ObjectId) {
    let area = p.area;
    let percent = p.builder.attribute_type(
        area,
        "att.percent",
        AttributeTypeSpec::Integer {
            byte_count: 2,
            range: Some(IntegerRange {
                minimum: 0,
                maximum: 100,
            }),
            states: Vec::new(),
        },
    );
    let limit = p.builder.attribute(area, "limit", 1, percent);
    let threshold = p.builder.attribute_group(area, "atg.threshold", vec![limit]);
    let desired = p.builder.aspect(area, pids::ASP_PARAMETER_DESIRED);
    let target = p.builder.aspect(area, pids::ASP_PARAMETER_TARGET);
    p.builder
        .usage(area, threshold, desired, Usage::OnlineDataAsSourceReceiver);
    p.builder
        .usage(area, threshold, target, Usage::OnlineDataAsSenderDrain);

    let datasets = p
        .builder
        .attribute_group(area, pids::ATG_DEFAULT_PARAMETER_DATASETS, Vec::new());
    let datasets_usage = p.builder.usage(
        area,
        datasets,
        p.meta.properties_aspect,
        Usage::OptionalConfigurationData,
    );
    let sensor_type = p.builder.object_type(
        area,
        "typ.sensor",
        TypeSpec {
            attribute_groups: vec![threshold, datasets],
            ..TypeSpec::default()
        },
    );
    let sensor = p.builder.object(area, "obj.sensor", sensor_type);
    (sensor, datasets_usage, sensor_type, threshold)
}

fn datasets_record(entries: Vec<Data>) -> Data {
    Data::record([(
        pids::default_parameter::DATASETS,
        Data::Array(entries),
    )])
}

fn limit_bytes(limit: i64) -> Vec<u8> {
    serialize_record(&Data::record([("limit", Data::Integer(limit))])).expect("encode")
}

#[test]
fn one_valid_default_dataset_per_parameter_is_clean() {
    let mut p = plant();
    let (sensor, usage, sensor_type, threshold) = sensor_fixture(&mut p);
    let entry = dataset_entry(sensor_type, threshold, 3, &limit_bytes(40));
    p.builder.set_data(sensor, usage, datasets_record(vec![entry]));
    assert_clean(&check(&p.build(), &[]));
}

#[test]
fn default_dataset_problems_are_warnings() {
    let mut p = plant();
    let (sensor, usage, sensor_type, threshold) = sensor_fixture(&mut p);
    p.builder.set_data(sensor, usage, datasets_record(Vec::new()));
    let missing = check(&p.build(), &[]);
    assert_eq!(
        summary(&missing),
        vec![(
            Severity::Warning,
            finding_class::PARAMETER_DEFAULT_MISSING.to_string()
        )]
    );

    let mut p = plant();
    let (sensor, usage, sensor_type, threshold) = sensor_fixture(&mut p);
    let twice = vec![
        dataset_entry(sensor_type, threshold, 3, &limit_bytes(40)),
        dataset_entry(sensor_type, threshold, 2, &limit_bytes(60)),
    ];
    p.builder.set_data(sensor, usage, datasets_record(twice));
    let ambiguous = check(&p.build(), &[]);
    assert_eq!(
        summary(&ambiguous),
        vec![(
            Severity::Warning,
            finding_class::PARAMETER_DEFAULT_AMBIGUOUS.to_string()
        )]
    );

    let mut p = plant();
    let (sensor, usage, sensor_type, threshold) = sensor_fixture(&mut p);
    let broken = vec![
        dataset_entry(sensor_type, threshold, 7, &limit_bytes(40)),
        dataset_entry(sensor_type, threshold, 3, &limit_bytes(-32_768)),
        dataset_entry(sensor_type, threshold, 3, b"not a record"),
    ];
    p.builder.set_data(sensor, usage, datasets_record(broken));
    let invalid = check(&p.build(), &[]);
    assert_eq!(invalid.count_class(finding_class::PARAMETER_DEFAULT_INVALID), 3);
    assert_eq!(invalid.count_class(finding_class::PARAMETER_DEFAULT_MISSING), 1);
    assert!(invalid.findings.iter().all(|f| f.severity == Severity::Warning));
}

/// Types `typ.a`, `typ.b`, `typ.c`, each with a set `next`, and an object
/// carrying a hierarchy definition with the given edges.
fn hierarchy_catalog(edges: &[(&str, &str)]) -> ObjectStore {
    let mut p = plant();
    let area = p.area;
    let any = p.builder.set_type(
        area,
        "mt.next",
        SetTypeSpec {
            object_types: Vec::new(),
            minimum: 0,
            maximum: 0,
            mutable: false,
            reference: ReferenceType::Association,
        },
    );
    for pid in ["typ.a", "typ.b", "typ.c"] {
        let object_type = p.builder.object_type(area, pid, TypeSpec::default());
        p.builder.set_use(area, object_type, "next", any, false);
    }

    let group = p
        .builder
        .attribute_group(area, pids::ATG_HIERARCHY_DEFINITION, Vec::new());
    let usage = p.builder.usage(
        area,
        group,
        p.meta.properties_aspect,
        Usage::OptionalConfigurationData,
    );
    let definer_type = p.builder.object_type(
        area,
        "typ.parameterHierarchy",
        TypeSpec {
            attribute_groups: vec![group],
            ..TypeSpec::default()
        },
    );
    let definer = p.builder.object(area, "obj.hierarchy", definer_type);
    let entries = edges
        .iter()
        .map(|(from, to)| {
            Data::record([
                (pids::hierarchy::OBJECT_TYPE, Data::Text((*from).to_string())),
                (pids::hierarchy::SET_NAME, Data::Text("next".to_string())),
                (pids::hierarchy::SUCCESSOR_TYPE, Data::Text((*to).to_string())),
            ])
        })
        .collect();
    p.builder.set_data(
        definer,
        usage,
        Data::record([
            (pids::hierarchy::OBJECT_TYPE, Data::Text("typ.a".to_string())),
            (pids::hierarchy::ENTRIES, Data::Array(entries)),
        ]),
    );
    p.build()
}

#[test]
fn hierarchy_cycle_is_reported_once() {
    let store = hierarchy_catalog(&[("typ.a", "typ.b"), ("typ.b", "typ.c"), ("typ.c", "typ.a")]);
    let result = check(&store, &[]);
    assert_eq!(
        summary(&result),
        vec![(
            Severity::InterferenceError,
            finding_class::HIERARCHY_CYCLE.to_string()
        )]
    );
    assert!(result.findings[0].message.contains("typ.c"));
    assert!(result.findings[0].message.contains("typ.a"));
}

#[test]
fn acyclic_hierarchy_is_clean() {
    let store = hierarchy_catalog(&[("typ.a", "typ.b"), ("typ.b", "typ.c")]);
    assert_clean(&check(&store, &[]));
}

#[test]
fn hierarchy_naming_unknown_type_is_interference() {
    let store = hierarchy_catalog(&[("typ.a", "typ.missing")]);
    let result = check(&store, &[]);
    assert_eq!(
        summary(&result),
        vec![(
            Severity::InterferenceError,
            finding_class::HIERARCHY_UNKNOWN_PID.to_string()
        )]
    );
}

fn with_recorded_dependency(kind: DependencyKind) -> Plant {
    let mut p = plant();
    let (area, remote) = (p.area, p.remote);
    if let Some(metadata) = p.builder.area_metadata_mut(area) {
        metadata.dependencies = Some(DependencyRecord {
            version: 1,
            dependencies: BTreeSet::from([AreaDependency {
                dependent_version: 1,
                area: remote,
                needed_version: 5,
                kind,
            }]),
        });
    }
    // A defect the later phases would report.
    p.builder.object(area, "obj.twin", p.thing);
    p.builder.object(area, "obj.twin", p.thing);
    p
}

#[test]
fn missing_required_area_stops_the_check() {
    let p = with_recorded_dependency(DependencyKind::Required);
    let area = p.area;
    let result = check(&p.build(), &[(area, 2)]);

    assert_eq!(
        summary(&result),
        vec![(
            Severity::LocalError,
            finding_class::AREA_DEPENDENCY_MISSING.to_string()
        )]
    );
    assert_eq!(result.stats.objects_checked, 0);
}

#[test]
fn too_old_pinned_area_is_reported_and_checking_continues() {
    let p = with_recorded_dependency(DependencyKind::Required);
    let (area, remote) = (p.area, p.remote);
    let result = check(&p.build(), &[(area, 2), (remote, 2)]);

    assert_eq!(result.count_class(finding_class::AREA_DEPENDENCY_VERSION), 1);
    assert_eq!(result.count_class(finding_class::PID_DUPLICATE_IN_AREA), 1);
    assert!(result.stats.objects_checked > 0);
}

#[test]
fn unsatisfied_optional_dependency_is_a_warning() {
    let p = with_recorded_dependency(DependencyKind::Optional);
    let area = p.area;
    let result = check(&p.build(), &[(area, 2)]);

    assert_eq!(result.count_class(finding_class::AREA_DEPENDENCY_OPTIONAL), 1);
    assert_eq!(result.warnings().count(), 1);
    assert_eq!(result.count_class(finding_class::PID_DUPLICATE_IN_AREA), 1);
}

#[test]
fn interference_blocks_local_activation_but_not_release_for_transfer() {
    let mut p = plant();
    let (linker, usage) = p.linker(ReferenceType::Aggregation, false);
    p.link(linker, usage, "obj.dangling", ObjectId(987_654));
    let area = p.area;
    let mut store = p.build();

    let blocked = run_consistency_check(
        &mut store,
        &[(area, 2)],
        KindOfConsistencyCheck::LocalActivation,
        &local_config(),
    );
    assert!(blocked.has_interference_errors());
    assert!(!blocked.dependencies_persisted);
    assert!(!blocked.accepted());
    assert_eq!(store.area_metadata(area).expect("metadata").dependencies, None);

    let released = run_consistency_check(
        &mut store,
        &[(area, 2)],
        KindOfConsistencyCheck::ReleaseForTransfer,
        &local_config(),
    );
    assert!(released.dependencies_persisted);
    assert!(released.accepted());
    let record = store
        .area_metadata(area)
        .expect("metadata")
        .dependencies
        .expect("dependencies persisted");
    assert_eq!(record.version, 2);
}

#[test]
fn repeated_checks_record_the_same_dependencies() {
    let mut p = plant();
    let (linker, usage) = p.linker(ReferenceType::Aggregation, false);
    let target = p.builder.object(p.remote, "obj.target", p.thing);
    p.link(linker, usage, "obj.source", target);
    p.link(linker, usage, "obj.again", target);
    let area = p.area;
    let mut store = p.build();
    let pins = [(area, 2)];
    let kind = KindOfConsistencyCheck::ReleaseForActivationWithoutLocalActivation;

    let first = run_consistency_check(&mut store, &pins, kind, &local_config());
    let after_first = store.area_metadata(area).expect("metadata");
    let second = run_consistency_check(&mut store, &pins, kind, &local_config());
    let after_second = store.area_metadata(area).expect("metadata");

    assert_eq!(
        first.stats.dependencies_recorded,
        second.stats.dependencies_recorded
    );
    assert_eq!(first.stats.dependencies_recorded, 2);
    assert_eq!(after_first, after_second);
}

#[test]
fn plain_consistency_check_never_persists() {
    let p = plant();
    let area = p.area;
    let mut store = p.build();
    let result = run_consistency_check(
        &mut store,
        &[(area, 2)],
        KindOfConsistencyCheck::ConsistencyCheck,
        &local_config(),
    );
    assert_clean(&result);
    assert!(!result.dependencies_persisted);
    assert_eq!(store.area_metadata(area).expect("metadata").dependencies, None);
}

#[test]
fn old_metamodel_skips_dependency_tracking() {
    let p = with_recorded_dependency(DependencyKind::Required);
    let area = p.area;
    let mut store = p.build();
    store.set_metamodel_version(8);
    let result = run_consistency_check(
        &mut store,
        &[(area, 2)],
        KindOfConsistencyCheck::ReleaseForTransfer,
        &local_config(),
    );

    assert_eq!(result.count_class(finding_class::AREA_DEPENDENCY_MISSING), 0);
    assert_eq!(result.stats.dependencies_recorded, 0);
    assert_eq!(result.count_class(finding_class::PID_DUPLICATE_IN_AREA), 1);
}

#[test]
fn cancelled_check_returns_partial_result_and_never_persists() {
    let p = plant();
    let area = p.area;
    let mut store = p.build();
    let token = CancelToken::new();
    token.cancel();

    let outcome = ConsistencyChecker::new(&store, local_config())
        .with_cancel_token(token)
        .check(&[(area, 2)], KindOfConsistencyCheck::ReleaseForTransfer);
    assert!(outcome.result.cancelled);
    assert!(outcome.pending.is_empty());
    assert!(!outcome.persistence_permitted());

    let result = outcome.commit(&mut store);
    assert!(!result.dependencies_persisted);
    assert!(!result.accepted());
    assert_eq!(store.area_metadata(area).expect("metadata").dependencies, None);
}

#[test]
fn unknown_pinned_area_becomes_an_internal_finding() {
    let store = plant().build();
    let result = check(&store, &[(ObjectId(424_242), 1)]);
    assert_eq!(
        summary(&result),
        vec![(Severity::LocalError, finding_class::CHECK_INTERNAL.to_string())]
    );
}
