#[cfg(test)]
mod tests {
    use crate::metadata::{HandlerType, MarkerSpec, MethodDecl, OperationMarker, ParamDecl};
    use crate::runtime::*;
    use directrpc_common::{CallEnvelope, DirectError, ErrorKind, Filter, SortDirection};
    use serde_json::{json, Map, Value};
    use std::sync::Arc;

    fn build(kind: OperationKind, params: Vec<ParamDecl>) -> CallDescriptor {
        build_marked(OperationMarker::new(kind), params)
    }

    fn build_marked(marker: OperationMarker, params: Vec<ParamDecl>) -> CallDescriptor {
        let method = params
            .into_iter()
            .fold(MethodDecl::new("op"), |method, param| method.param(param))
            .marked(marker);
        let ty = HandlerType::new("TestService").method(method);
        CallDescriptor::build("testService", &ty, "op").unwrap()
    }

    fn show_details(kind: OperationKind) -> CallDescriptor {
        build(
            kind,
            vec![
                ParamDecl::new("request", ParamType::Ambient(AmbientKind::Request)),
                ParamDecl::new("firstName", ParamType::Text),
                ParamDecl::new("token", ParamType::Text).header(MarkerSpec::optional().named("X-Token")),
                ParamDecl::new("lastName", ParamType::Text),
                ParamDecl::new("locale", ParamType::Ambient(AmbientKind::Locale)),
                ParamDecl::new("age", ParamType::Integer),
            ],
        )
    }

    fn ctx() -> AmbientContext {
        AmbientContext::new(RequestInfo::new("POST", "/router"))
    }

    fn call(data: Value) -> CallEnvelope {
        CallEnvelope::new("testService", "op", 1, data)
    }

    fn resolve(descriptor: &CallDescriptor, data: Value) -> directrpc_common::Result<Arguments> {
        ParameterResolver::default().resolve(descriptor, &call(data), &ctx())
    }

    fn value(args: &Arguments, index: usize) -> Value {
        match args.argument(index) {
            Some(Argument::Value(v)) => v.clone(),
            other => panic!("expected a value at {}, got {:?}", index, other),
        }
    }

    // ------------------------------------------------------------------
    // Descriptor construction
    // ------------------------------------------------------------------

    #[test]
    fn test_positional_counts_body_parameters_only() {
        let descriptor = show_details(OperationKind::Positional);
        assert_eq!(descriptor.parameters().len(), 6);
        assert_eq!(descriptor.summary(), &ParameterSummary::Count(3));

        let sources: Vec<BindingSource> = descriptor.parameters().iter().map(|p| p.source()).collect();
        assert_eq!(
            sources,
            vec![
                BindingSource::Ambient,
                BindingSource::Body,
                BindingSource::Header,
                BindingSource::Body,
                BindingSource::Ambient,
                BindingSource::Body,
            ]
        );
        assert_eq!(descriptor.parameters()[2].name(), "X-Token");
    }

    #[test]
    fn test_named_lists_body_parameter_names_in_order() {
        let descriptor = show_details(OperationKind::Named);
        assert_eq!(
            descriptor.summary(),
            &ParameterSummary::Names(vec!["firstName".into(), "lastName".into(), "age".into()])
        );
    }

    #[test]
    fn test_store_and_load_kinds_report_one_parameter() {
        for kind in [
            OperationKind::StoreRead,
            OperationKind::StoreModify,
            OperationKind::FormLoad,
            OperationKind::TreeLoad,
        ] {
            let descriptor = build(
                kind,
                vec![
                    ParamDecl::new("a", ParamType::Text),
                    ParamDecl::new("b", ParamType::Text),
                ],
            );
            assert_eq!(descriptor.summary(), &ParameterSummary::Count(1), "{}", kind);
        }
    }

    #[test]
    fn test_form_post_forward_path() {
        let ty = HandlerType::new("UploadController").with_path("/upload").method(
            MethodDecl::new("handle")
                .with_path("/file")
                .param(ParamDecl::new("name", ParamType::Text))
                .marked(OperationMarker::new(OperationKind::FormPost)),
        );
        let descriptor = CallDescriptor::build("uploadController", &ty, "handle").unwrap();
        assert_eq!(descriptor.forward_path(), Some("forward:upload/file"));
        assert!(descriptor.parameters().is_empty());
        assert_eq!(descriptor.summary(), &ParameterSummary::FormHandler);

        let root = HandlerType::new("Root").with_path("/").method(
            MethodDecl::new("post").marked(OperationMarker::new(OperationKind::FormPost)),
        );
        let descriptor = CallDescriptor::build("root", &root, "post").unwrap();
        assert_eq!(descriptor.forward_path(), Some("forward:"));
    }

    #[test]
    fn test_form_post_without_path_is_invalid() {
        let ty = HandlerType::new("Upload")
            .method(MethodDecl::new("handle").marked(OperationMarker::new(OperationKind::FormPost)));
        let err = CallDescriptor::build("upload", &ty, "handle").unwrap_err();
        assert!(matches!(err, DirectError::InvalidOperation { .. }));
    }

    #[test]
    fn test_positional_rejects_request_field_marker() {
        let ty = HandlerType::new("Svc").method(
            MethodDecl::new("op")
                .param(ParamDecl::new("id", ParamType::Integer).request_field(MarkerSpec::required()))
                .marked(OperationMarker::new(OperationKind::Positional)),
        );
        let err = CallDescriptor::build("svc", &ty, "op").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        assert!(err.to_string().contains("'id'"));
    }

    #[test]
    fn test_missing_marker_and_method() {
        let ty = HandlerType::new("Svc").method(MethodDecl::new("plain"));
        assert!(matches!(
            CallDescriptor::build("svc", &ty, "plain"),
            Err(DirectError::MissingMarker { .. })
        ));
        assert!(matches!(
            CallDescriptor::build("svc", &ty, "absent"),
            Err(DirectError::MethodNotFound { .. })
        ));
    }

    #[test]
    fn test_group_is_trimmed() {
        let descriptor = build_marked(
            OperationMarker::new(OperationKind::Positional).with_group("  admin, reports "),
            vec![],
        );
        assert_eq!(descriptor.group(), Some("admin, reports"));
        assert!(descriptor.matches_group(None));
        assert!(descriptor.matches_group(Some("reports")));
        assert!(descriptor.matches_group(Some("other,admin")));
        assert!(!descriptor.matches_group(Some("other")));

        let blank = build_marked(OperationMarker::new(OperationKind::Positional).with_group("   "), vec![]);
        assert_eq!(blank.group(), None);
        assert!(!blank.matches_group(Some("admin")));
    }

    #[test]
    fn test_generic_element_type_resolved_from_ancestor() {
        let base = Arc::new(
            HandlerType::new("AbstractStore").method(
                MethodDecl::new("update")
                    .param(ParamDecl::new("records", ParamType::list(ParamType::generic("T"))))
                    .marked(OperationMarker::new(OperationKind::StoreModify)),
            ),
        );
        let concrete = HandlerType::new("BookStore")
            .extending(base)
            .bind("T", ParamType::record("Book"));

        let descriptor = CallDescriptor::build("bookStore", &concrete, "update").unwrap();
        let records = &descriptor.parameters()[0];
        assert_eq!(records.declared_type(), &ParamType::list(ParamType::record("Book")));
        assert_eq!(records.element_type(), Some(&ParamType::record("Book")));
        assert_eq!(descriptor.entry_type(), Some(&ParamType::record("Book")));
    }

    #[test]
    fn test_direct_declaration_supplies_concrete_type() {
        let base = Arc::new(
            HandlerType::new("AbstractStore").method(
                MethodDecl::new("update")
                    .param(ParamDecl::new("records", ParamType::array(ParamType::generic("T"))))
                    .marked(OperationMarker::new(OperationKind::StoreModify)),
            ),
        );
        let concrete = HandlerType::new("AuthorStore").extending(base).method(
            MethodDecl::new("update")
                .param(ParamDecl::new("records", ParamType::array(ParamType::record("Author")))),
        );

        let descriptor = CallDescriptor::build("authorStore", &concrete, "update").unwrap();
        assert_eq!(
            descriptor.parameters()[0].element_type(),
            Some(&ParamType::record("Author"))
        );
    }

    #[test]
    fn test_unbound_generic_becomes_any() {
        let descriptor = build(
            OperationKind::Positional,
            vec![ParamDecl::new("items", ParamType::list(ParamType::generic("X")))],
        );
        assert_eq!(descriptor.parameters()[0].declared_type(), &ParamType::list(ParamType::Any));
    }

    #[test]
    fn test_cyclic_generic_binding_becomes_any() {
        let ty = HandlerType::new("LoopService")
            .bind("T", ParamType::list(ParamType::generic("E")))
            .bind("E", ParamType::generic("T"))
            .method(
                MethodDecl::new("op")
                    .param(ParamDecl::new("items", ParamType::list(ParamType::generic("T"))))
                    .marked(OperationMarker::new(OperationKind::Positional)),
            );
        let descriptor = CallDescriptor::build("loopService", &ty, "op").unwrap();
        assert_eq!(
            descriptor.parameters()[0].declared_type(),
            &ParamType::list(ParamType::list(ParamType::Any))
        );
    }

    #[test]
    fn test_entry_type_only_kept_for_store_modify() {
        let declared = build_marked(
            OperationMarker::new(OperationKind::StoreModify).with_entry_type(ParamType::record("Book")),
            vec![ParamDecl::new("records", ParamType::list(ParamType::Any))],
        );
        assert_eq!(declared.entry_type(), Some(&ParamType::record("Book")));

        let ignored = build_marked(
            OperationMarker::new(OperationKind::Named).with_entry_type(ParamType::record("Book")),
            vec![ParamDecl::new("names", ParamType::list(ParamType::Text))],
        );
        assert_eq!(ignored.entry_type(), Some(&ParamType::Text));
    }

    #[test]
    fn test_poll_summary_event() {
        let explicit = build_marked(OperationMarker::new(OperationKind::Poll).with_event("message"), vec![]);
        assert_eq!(explicit.summary(), &ParameterSummary::Poll { event: "message".into() });

        let defaulted = build(OperationKind::Poll, vec![]);
        assert_eq!(defaulted.summary(), &ParameterSummary::Poll { event: "op".into() });
    }

    #[test]
    fn test_marker_flags_and_defaults() {
        let descriptor = build_marked(
            OperationMarker::new(OperationKind::Positional).synchronized().streamed(),
            vec![
                ParamDecl::new("token", ParamType::Text).header(MarkerSpec::required().with_default("anon")),
                ParamDecl::new("user", ParamType::record("User")).principal(true),
                ParamDecl::new("maybe", ParamType::optional(ParamType::Integer)),
            ],
        );
        assert!(descriptor.synchronize_on_session());
        assert!(descriptor.stream_response());

        let token = &descriptor.parameters()[0];
        assert!(!token.is_required());
        assert_eq!(token.default_value(), Some("anon"));

        let user = &descriptor.parameters()[1];
        assert_eq!(user.source(), BindingSource::Principal);
        assert!(user.is_strict_type());

        let maybe = &descriptor.parameters()[2];
        assert!(maybe.is_optional_wrapper());
        assert_eq!(maybe.element_type(), Some(&ParamType::Integer));
    }

    // ------------------------------------------------------------------
    // Parameter resolution
    // ------------------------------------------------------------------

    #[test]
    fn test_positional_values_converted() {
        let descriptor = build(
            OperationKind::Positional,
            vec![
                ParamDecl::new("a", ParamType::Integer),
                ParamDecl::new("b", ParamType::Float),
                ParamDecl::new("flag", ParamType::Bool),
                ParamDecl::new("name", ParamType::Text),
            ],
        );
        let args = resolve(&descriptor, json!(["1", 2.5, "true", 42])).unwrap();
        assert_eq!(args.len(), 4);
        assert_eq!(value(&args, 0), json!(1));
        assert_eq!(value(&args, 1), json!(2.5));
        assert_eq!(value(&args, 2), json!(true));
        assert_eq!(value(&args, 3), json!("42"));
    }

    #[test]
    fn test_ambient_parameters_skip_the_cursor() {
        let descriptor = show_details(OperationKind::Positional);
        let ctx = AmbientContext::new(RequestInfo::new("POST", "/router")).with_locale("fr");
        let args = ParameterResolver::default()
            .resolve(&descriptor, &call(json!(["Ralph", "Schaer", "30"])), &ctx)
            .unwrap();

        assert!(matches!(args.ambient(0), Some(AmbientValue::Request(_))));
        assert_eq!(value(&args, 1), json!("Ralph"));
        assert!(matches!(args.argument(2), Some(Argument::Null)));
        assert_eq!(value(&args, 3), json!("Schaer"));
        assert!(matches!(args.ambient(4), Some(AmbientValue::Locale(l)) if l == "fr"));
        assert_eq!(args.get::<i64>(5).unwrap(), Some(30));
    }

    #[test]
    fn test_named_resolves_from_map() {
        let descriptor = show_details(OperationKind::Named);
        let args = resolve(&descriptor, json!({"age": 30, "lastName": "Schaer", "firstName": "Ralph"})).unwrap();
        assert_eq!(value(&args, 1), json!("Ralph"));
        assert_eq!(value(&args, 3), json!("Schaer"));
        assert_eq!(value(&args, 5), json!(30));
    }

    #[test]
    fn test_named_rejects_list_payload() {
        let descriptor = show_details(OperationKind::Named);
        let err = resolve(&descriptor, json!(["Ralph"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_missing_required_header_names_parameter() {
        let descriptor = build(
            OperationKind::Positional,
            vec![ParamDecl::new("token", ParamType::Text).header(MarkerSpec::required().named("X-Token"))],
        );
        let err = resolve(&descriptor, json!([])).unwrap_err();
        match err {
            DirectError::MissingParameter { origin, name, type_name } => {
                assert_eq!(origin, "header");
                assert_eq!(name, "X-Token");
                assert_eq!(type_name, "String");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_header_default_and_present_values() {
        let descriptor = build(
            OperationKind::Positional,
            vec![
                ParamDecl::new("limit", ParamType::Integer).header(MarkerSpec::required().with_default("25")),
                ParamDecl::new("trace", ParamType::Bool).header(MarkerSpec::optional().named("X-Trace")),
            ],
        );
        let args = resolve(&descriptor, json!([])).unwrap();
        assert_eq!(value(&args, 0), json!(25));
        assert!(matches!(args.argument(1), Some(Argument::Null)));

        let ctx = AmbientContext::new(RequestInfo::new("POST", "/router").with_header("x-trace", "yes"));
        let args = ParameterResolver::default()
            .resolve(&descriptor, &call(json!([])), &ctx)
            .unwrap();
        assert_eq!(value(&args, 1), json!(true));
    }

    #[test]
    fn test_optional_header_absent_is_empty() {
        let descriptor = build(
            OperationKind::Positional,
            vec![ParamDecl::new("token", ParamType::optional(ParamType::Text)).header(MarkerSpec::required())],
        );
        let args = resolve(&descriptor, json!([])).unwrap();
        assert!(matches!(args.argument(0), Some(Argument::Empty)));
    }

    #[test]
    fn test_cookie_and_metadata() {
        let descriptor = build(
            OperationKind::Positional,
            vec![
                ParamDecl::new("session", ParamType::Text).cookie(MarkerSpec::required().named("SID")),
                ParamDecl::new("tenant", ParamType::Integer).metadata(MarkerSpec::required()),
            ],
        );
        let mut metadata = Map::new();
        metadata.insert("tenant".into(), json!("12"));
        let with_metadata = call(json!([])).with_metadata(metadata);
        let with_cookie = AmbientContext::new(RequestInfo::new("POST", "/router").with_cookie("SID", "abc"));

        let args = ParameterResolver::default()
            .resolve(&descriptor, &with_metadata, &with_cookie)
            .unwrap();
        assert_eq!(value(&args, 0), json!("abc"));
        assert_eq!(value(&args, 1), json!(12));

        let err = ParameterResolver::default()
            .resolve(&descriptor, &call(json!([])), &with_cookie)
            .unwrap_err();
        assert!(err.to_string().contains("metadata 'tenant'"));
    }

    #[test]
    fn test_optional_body_absent_is_empty() {
        let descriptor = build(
            OperationKind::Positional,
            vec![
                ParamDecl::new("id", ParamType::Integer),
                ParamDecl::new("comment", ParamType::optional(ParamType::Text)),
            ],
        );
        let args = resolve(&descriptor, json!([7])).unwrap();
        assert_eq!(value(&args, 0), json!(7));
        assert!(matches!(args.argument(1), Some(Argument::Empty)));

        let args = resolve(&descriptor, json!([7, null])).unwrap();
        assert!(matches!(args.argument(1), Some(Argument::Empty)));
    }

    #[test]
    fn test_missing_body_value_is_unresolvable() {
        let descriptor = build(
            OperationKind::Positional,
            vec![
                ParamDecl::new("a", ParamType::Integer),
                ParamDecl::new("b", ParamType::Integer),
            ],
        );
        let err = resolve(&descriptor, json!([1])).unwrap_err();
        assert!(matches!(err, DirectError::UnresolvableParameter { index: 1 }));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_conversion_error_names_parameter_and_target() {
        let descriptor = build(OperationKind::Positional, vec![ParamDecl::new("age", ParamType::Integer)]);
        let err = resolve(&descriptor, json!(["old"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
        match err {
            DirectError::Conversion { name, target, .. } => {
                assert_eq!(name, "age");
                assert_eq!(target, "Integer");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_collection_falls_back_to_codec() {
        let codec = SerdeJsonCodec::new().with_schema(RecordSchema::new("Book").field("id", ParamType::Integer));
        let resolver = ParameterResolver::new(Arc::new(DefaultConversionService::new()), Arc::new(codec));
        let descriptor = build(
            OperationKind::Positional,
            vec![ParamDecl::new("books", ParamType::list(ParamType::record("Book")))],
        );
        let args = resolver
            .resolve(&descriptor, &call(json!([[{"id": "1", "x": 0}, {"id": 2}]])), &ctx())
            .unwrap();
        assert_eq!(value(&args, 0), json!([{"id": 1}, {"id": 2}]));
    }

    #[test]
    fn test_non_collection_scalar_failure_is_not_retried() {
        let descriptor = build(OperationKind::Positional, vec![ParamDecl::new("n", ParamType::Float)]);
        let err = resolve(&descriptor, json!(["[1.5]"])).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conversion);
    }

    #[test]
    fn test_store_read_paging_and_residual() {
        let descriptor = build(
            OperationKind::StoreRead,
            vec![
                ParamDecl::new("request", ParamType::StoreRead),
                ParamDecl::new("tenant", ParamType::Text),
            ],
        );
        let args = resolve(
            &descriptor,
            json!([{
                "page": 2,
                "limit": 10,
                "filter": "[{\"property\":\"name\",\"value\":\"Ralph\"}]",
                "sort": [{"property": "name", "direction": "DESC"}],
                "tenant": "acme"
            }]),
        )
        .unwrap();

        let request = args.store_read(0).unwrap();
        assert_eq!(request.start, Some(10));
        assert_eq!(request.page, Some(2));
        assert_eq!(
            request.filters,
            vec![Filter::Text { field: "name".into(), value: "Ralph".into() }]
        );
        assert_eq!(request.sorters[0].direction, Some(SortDirection::Descending));
        assert_eq!(request.params.get("tenant"), Some(&json!("acme")));
        assert_eq!(request.params.len(), 1);
        assert_eq!(value(&args, 1), json!("acme"));
    }

    #[test]
    fn test_store_read_start_computes_page() {
        let descriptor = build(OperationKind::StoreRead, vec![ParamDecl::new("request", ParamType::StoreRead)]);
        let args = resolve(&descriptor, json!([{"start": 10, "limit": 10}])).unwrap();
        assert_eq!(args.store_read(0).and_then(|r| r.page), Some(2));

        let args = resolve(&descriptor, json!([{"start": 15, "page": 7, "limit": 10}])).unwrap();
        let request = args.store_read(0).unwrap();
        assert_eq!((request.start, request.page), (Some(15), Some(7)));
    }

    #[test]
    fn test_store_read_extreme_paging_values_resolve() {
        let descriptor = build(OperationKind::StoreRead, vec![ParamDecl::new("request", ParamType::StoreRead)]);

        let args = resolve(&descriptor, json!([{"start": i64::MIN, "limit": -1}])).unwrap();
        let request = args.store_read(0).unwrap();
        assert_eq!((request.start, request.page), (Some(i64::MIN), None));

        let args = resolve(&descriptor, json!([{"page": i64::MAX, "limit": 10}])).unwrap();
        let request = args.store_read(0).unwrap();
        assert_eq!((request.start, request.page), (None, Some(i64::MAX)));
    }

    #[test]
    fn test_store_read_literal_filter_list_and_legacy_sort() {
        let descriptor = build(OperationKind::StoreRead, vec![ParamDecl::new("request", ParamType::StoreRead)]);
        let args = resolve(
            &descriptor,
            json!([{
                "filter": [
                    {"type": "numeric", "field": "age", "value": "30", "comparison": "gt"},
                    {"type": "unknown", "field": "x", "value": 1}
                ],
                "sort": "name",
                "dir": "ASC"
            }]),
        )
        .unwrap();
        let request = args.store_read(0).unwrap();
        assert_eq!(request.filters.len(), 1);
        assert!(request.first_filter_for_field("age").is_some());
        assert!(request.is_ascending_sort());
        assert_eq!(request.sorters[0].property, "name");
        assert!(request.params.is_empty());
    }

    #[test]
    fn test_store_read_without_payload_binds_null() {
        let descriptor = build(OperationKind::StoreRead, vec![ParamDecl::new("request", ParamType::StoreRead)]);
        let args = resolve(&descriptor, Value::Null).unwrap();
        assert!(matches!(args.argument(0), Some(Argument::Null)));
    }

    #[test]
    fn test_store_modify_records_and_residual() {
        let descriptor = build(
            OperationKind::StoreModify,
            vec![
                ParamDecl::new("records", ParamType::list(ParamType::record("User"))),
                ParamDecl::new("id", ParamType::Integer),
            ],
        );
        let args = resolve(
            &descriptor,
            json!([{"records": [{"id": 10, "name": "Ralph"}], "id": 7}]),
        )
        .unwrap();

        match args.argument(0) {
            Some(Argument::Records(records)) => {
                assert_eq!(records, &vec![json!({"id": 10, "name": "Ralph"})]);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(value(&args, 1), json!(7));
    }

    #[test]
    fn test_store_modify_list_single_and_bare_record() {
        let codec = SerdeJsonCodec::new().with_schema(
            RecordSchema::new("User")
                .field("id", ParamType::Integer)
                .field("name", ParamType::Text),
        );
        let resolver = ParameterResolver::new(Arc::new(DefaultConversionService::new()), Arc::new(codec));
        let descriptor = build(
            OperationKind::StoreModify,
            vec![ParamDecl::new("records", ParamType::list(ParamType::record("User")))],
        );

        let records = |data: Value| -> Vec<Value> {
            let args = resolver.resolve(&descriptor, &call(data), &ctx()).unwrap();
            match args.into_vec().remove(0) {
                Argument::Records(records) => records,
                other => panic!("unexpected {:?}", other),
            }
        };

        assert_eq!(records(json!([[{"id": "1"}, {"id": 2}]])), vec![json!({"id": 1}), json!({"id": 2})]);
        assert_eq!(records(json!([{"records": {"id": 3, "name": "x", "extra": 1}}])), vec![json!({"id": 3, "name": "x"})]);
        assert_eq!(records(json!([{"id": 4}])), vec![json!({"id": 4})]);
    }

    #[test]
    fn test_store_modify_record_conversion_failure() {
        let codec = SerdeJsonCodec::new().with_schema(RecordSchema::new("User").field("id", ParamType::Integer));
        let resolver = ParameterResolver::new(Arc::new(DefaultConversionService::new()), Arc::new(codec));
        let descriptor = build(
            OperationKind::StoreModify,
            vec![ParamDecl::new("records", ParamType::list(ParamType::record("User")))],
        );
        let err = resolver
            .resolve(&descriptor, &call(json!([[{"id": "one"}]])), &ctx())
            .unwrap_err();
        assert!(matches!(err, DirectError::Conversion { ref name, .. } if name == "records"));
    }

    #[test]
    fn test_form_and_tree_load_use_first_element_as_residual() {
        for kind in [OperationKind::FormLoad, OperationKind::TreeLoad] {
            let descriptor = build(
                kind,
                vec![
                    ParamDecl::new("node", ParamType::Text),
                    ParamDecl::new("depth", ParamType::Integer),
                ],
            );
            let args = resolve(&descriptor, json!([{"node": "root"}, "3"])).unwrap();
            assert_eq!(value(&args, 0), json!("root"));
            assert_eq!(value(&args, 1), json!(3));
        }
    }

    #[test]
    fn test_missing_request_field_does_not_consume_positional() {
        for kind in [OperationKind::FormLoad, OperationKind::TreeLoad] {
            let descriptor = build(
                kind,
                vec![
                    ParamDecl::new("node", ParamType::Text).request_field(MarkerSpec::optional()),
                    ParamDecl::new("depth", ParamType::Integer),
                ],
            );
            let args = resolve(&descriptor, json!([{"other": "x"}, "3"])).unwrap();
            assert!(matches!(args.argument(0), Some(Argument::Null)));
            assert_eq!(value(&args, 1), json!(3));

            let args = resolve(&descriptor, json!([{"node": "root"}, 4])).unwrap();
            assert_eq!(value(&args, 0), json!("root"));
            assert_eq!(value(&args, 1), json!(4));
        }
    }

    #[test]
    fn test_request_field_marker_on_named_call() {
        let descriptor = build(
            OperationKind::Named,
            vec![
                ParamDecl::new("id", ParamType::Integer).request_field(MarkerSpec::required().named("userId")),
                ParamDecl::new("filter", ParamType::Text).request_field(MarkerSpec::optional().with_default("all")),
                ParamDecl::new("note", ParamType::Text).request_field(MarkerSpec::optional()),
            ],
        );
        let args = resolve(&descriptor, json!({"userId": "5"})).unwrap();
        assert_eq!(value(&args, 0), json!(5));
        assert_eq!(value(&args, 1), json!("all"));
        assert!(matches!(args.argument(2), Some(Argument::Null)));

        let err = resolve(&descriptor, json!({})).unwrap_err();
        assert!(matches!(err, DirectError::MissingParameter { ref name, .. } if name == "userId"));
    }

    #[test]
    fn test_poll_treated_like_named() {
        let descriptor = build(OperationKind::Poll, vec![ParamDecl::new("since", ParamType::Integer)]);
        let args = resolve(&descriptor, json!({"since": "100"})).unwrap();
        assert_eq!(value(&args, 0), json!(100));
    }

    #[test]
    fn test_form_post_is_not_resolvable() {
        let ty = HandlerType::new("Upload").with_path("/upload").method(
            MethodDecl::new("op").marked(OperationMarker::new(OperationKind::FormPost)),
        );
        let descriptor = CallDescriptor::build("upload", &ty, "op").unwrap();
        let err = resolve(&descriptor, json!([])).unwrap_err();
        assert!(matches!(err, DirectError::UnsupportedCall(_)));
    }

    #[test]
    fn test_principal_binding() {
        let descriptor = build(
            OperationKind::Positional,
            vec![
                ParamDecl::new("name", ParamType::Text).principal(false),
                ParamDecl::new("user", ParamType::record("User")).principal(false),
                ParamDecl::new("admin", ParamType::record("Admin")).principal(false),
            ],
        );
        let signed_in = ctx().with_principal(Principal::new("ralph", "User"));
        let args = ParameterResolver::default()
            .resolve(&descriptor, &call(json!([])), &signed_in)
            .unwrap();
        assert_eq!(value(&args, 0), json!("ralph"));
        assert_eq!(args.principal(1).map(Principal::name), Some("ralph"));
        assert!(matches!(args.argument(2), Some(Argument::Null)));

        let anonymous = ParameterResolver::default()
            .resolve(&descriptor, &call(json!([])), &ctx())
            .unwrap();
        assert!(anonymous.iter().all(Argument::is_absent));
    }

    #[test]
    fn test_strict_principal_mismatch_fails() {
        let descriptor = build(
            OperationKind::Positional,
            vec![ParamDecl::new("admin", ParamType::record("Admin")).principal(true)],
        );
        let ctx = ctx().with_principal(Principal::new("ralph", "User"));
        let err = ParameterResolver::default()
            .resolve(&descriptor, &call(json!([])), &ctx)
            .unwrap_err();
        match err {
            DirectError::PrincipalTypeMismatch { name, expected, actual } => {
                assert_eq!(name, "admin");
                assert_eq!(expected, "Admin");
                assert_eq!(actual, "User");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_call_envelope_ambient() {
        let descriptor = build(
            OperationKind::Positional,
            vec![ParamDecl::new("envelope", ParamType::Ambient(AmbientKind::CallEnvelope))],
        );
        let args = resolve(&descriptor, json!([])).unwrap();
        match args.ambient(0) {
            Some(AmbientValue::CallEnvelope(envelope)) => assert_eq!(envelope.action, "testService"),
            other => panic!("unexpected {:?}", other),
        }
    }
}
