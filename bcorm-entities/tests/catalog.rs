use std::collections::BTreeMap;
use std::io::Write;
use std::sync::{Arc, Mutex};

use bcorm_data::{
    Entity, EntityError, EntityManager, EntityManagerEvent, EntityType, HandlerError, HasManyHandler,
    KeyMode, Mapper, MapperError, OrmError, Pageable, Parent, RelationHandler, Repository,
};
use bcorm_entities::prelude::*;
use bcorm_events::EventBus;
use bcorm_test::{CallKind, MockClient};
use serde_json::{json, Map, Value};

fn manager() -> (Arc<MockClient>, EntityManager) {
    let mock = MockClient::shared();
    let mapper = Mapper::new();
    register_all(&mapper);
    let em = EntityManager::new(mock.clone()).with_mapper(mapper);
    (mock, em)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("expected a JSON object"),
    }
}

// ── Metadata ───────────────────────────────────────────────────────────

#[test]
fn test_register_all_knows_every_entity() {
    let mapper = Mapper::new();
    register_all(&mapper);
    assert_eq!(mapper.registry().len(), 28);
    assert_eq!(mapper.object("ProductReview").unwrap().descriptor().name, "ProductReview");
}

#[test]
fn test_metadata_is_cached_per_type() {
    let mapper = Mapper::new();
    let first = mapper.metadata_of::<Product>();
    let second = mapper.metadata_of::<Product>();
    assert!(Arc::ptr_eq(&first, &second));

    let mut product = Product::default();
    mapper.patch(&mut product, &json!({"name": "Lamp"}), false).unwrap();
    assert!(Arc::ptr_eq(product.metadata().unwrap(), &first));
    assert!(Arc::ptr_eq(&mapper.metadata(&product), &first));
}

#[test]
fn test_product_metadata_partitions() {
    let mapper = Mapper::new();
    let metadata = mapper.metadata_of::<Product>();
    assert_eq!(metadata.relation_fields().len(), 9);
    assert_eq!(metadata.include_fields().len(), 7);
    assert_eq!(metadata.auto_load_fields().len(), 2);
    assert_eq!(metadata.required_fields().len(), 1);
    assert_eq!(metadata.readonly_fields().len(), 3);
    assert!(metadata.in_result_fields().is_empty());

    let customised: Vec<_> = metadata.customised_fields().iter().map(|f| f.field).collect();
    assert_eq!(customised, vec!["type"]);
    assert_eq!(metadata.resource().unwrap().path, "/catalog/products");
}

#[test]
fn test_nested_resources_have_param_fields() {
    let mapper = Mapper::new();
    let metadata = mapper.metadata_of::<ProductModifierValue>();
    let params: Vec<_> = metadata.param_fields().iter().map(|f| f.field).collect();
    assert_eq!(params, vec!["product_id", "modifier_id"]);

    let image = mapper.metadata_of::<ProductImage>();
    let uploads: Vec<_> = image.upload_fields().iter().map(|f| f.field).collect();
    assert_eq!(uploads, vec!["image_file"]);
}

#[test]
fn test_check_required_fields() {
    let mapper = Mapper::new();
    let product = Product::default();
    let missing = mapper.check_required_fields(&product);
    assert_eq!(missing, BTreeMap::from([("name".to_string(), "name".to_string())]));

    let mut named = Product::default();
    named.name = Some("Lamp".into());
    assert!(mapper.check_required_fields(&named).is_empty());

    assert!(mapper.check_required_fields(&CustomerAddress::default()).is_empty());
}

// ── Paths ──────────────────────────────────────────────────────────────

#[test]
fn test_resource_path_from_param_field() {
    let mapper = Mapper::new();
    let mut review = ProductReview::default();
    review.product_id = Some(111);
    assert_eq!(
        mapper.resource_path(&review, &Parent::None).unwrap(),
        "/catalog/products/111/reviews"
    );
    assert_eq!(
        mapper.resource_path(&Product::default(), &Parent::None).unwrap(),
        "/catalog/products"
    );
}

#[test]
fn test_resource_path_unresolved_placeholder() {
    let mapper = Mapper::new();
    let mut value = ProductModifierValue::default();
    value.product_id = Some(111);

    let err = mapper.resource_path(&value, &Parent::None).unwrap_err();
    assert_eq!(
        err,
        MapperError::UnresolvedPath {
            path: "/catalog/products/{product_id}/modifiers/{modifier_id}/values".into(),
            param: "modifier_id".into(),
        }
    );

    // A parent id fills the single placeholder left.
    assert_eq!(
        mapper.resource_path(&value, &Parent::id(5)).unwrap(),
        "/catalog/products/111/modifiers/5/values"
    );
}

#[test]
fn test_resource_path_requires_resource() {
    let mapper = Mapper::new();
    let err = mapper.resource_path(&LineItem::default(), &Parent::None).unwrap_err();
    assert_eq!(err, MapperError::MissingResource("LineItem"));
}

// ── Mapping ────────────────────────────────────────────────────────────

#[test]
fn test_patch_skips_readonly_unless_from_wire() {
    let mapper = Mapper::new();
    let data = json!({"id": 7, "name": "Lamp", "date_created": "2024-01-01"});

    let user: Product = mapper.patch_new(&data, false).unwrap();
    assert_eq!(user.id, None);
    assert_eq!(user.name.as_deref(), Some("Lamp"));
    assert_eq!(user.date_created, None);
    assert!(user.is_patched());

    let wire: Product = mapper.patch_new(&data, true).unwrap();
    assert_eq!(wire.id, Some(7));
    assert_eq!(wire.date_created.as_deref(), Some("2024-01-01"));
}

#[test]
fn test_to_array_and_back() {
    let mapper = Mapper::new();
    let product: Product = mapper
        .patch_new(
            &json!({
                "id": 7,
                "name": "Lamp",
                "type": "physical",
                "price": "12.5",
                "images": [{"id": 1, "product_id": 7, "url_zoom": "https://cdn/zoom.jpg"}]
            }),
            true,
        )
        .unwrap();
    assert_eq!(product.price, Some(12.5));

    let by_field = mapper.to_array(&product, KeyMode::FieldName);
    assert_eq!(by_field["type"], json!("physical"));
    assert_eq!(by_field["sku"], Value::Null);
    assert_eq!(by_field["images"][0]["url_zoom"], json!("https://cdn/zoom.jpg"));
    assert_eq!(by_field["primary_image"], Value::Null);

    let by_property = mapper.to_array(&product, KeyMode::PropertyName);
    assert_eq!(by_property["kind"], json!("physical"));
    assert!(by_property.get("type").is_none());

    let copy: Product = mapper.patch_new(&Value::Object(by_field), true).unwrap();
    assert_eq!(copy.id, Some(7));
    assert_eq!(copy.kind.as_deref(), Some("physical"));
    assert_eq!(copy.price, Some(12.5));
    assert_eq!(copy.images.len(), 1);
    assert_eq!(copy.images[0].url_zoom.as_deref(), Some("https://cdn/zoom.jpg"));
}

#[test]
fn test_property_accessors() {
    let mapper = Mapper::new();
    let mut product = Product::default();
    mapper
        .set_property_value_by_name(&mut product, "kind", json!("digital"))
        .unwrap();
    assert_eq!(mapper.property_value_by_name(&product, "kind").unwrap(), json!("digital"));
    assert_eq!(mapper.property_value_by_field_name(&product, "type").unwrap(), json!("digital"));
    assert_eq!(mapper.property_value_by_name(&product, "images").unwrap(), json!([]));

    mapper
        .set_property_value_by_name(&mut product, "is_new", json!(true))
        .unwrap();
    assert!(product.is_new());

    let err = mapper.property_value_by_name(&product, "colour").unwrap_err();
    assert!(matches!(err, MapperError::UnknownProperty { entity: "Product", .. }));
}

#[test]
fn test_writable_field_values_skip_params_and_readonly() {
    let mapper = Mapper::new();
    let mut modifier = ProductModifier::default();
    modifier.id = Some(3);
    modifier.product_id = Some(111);
    modifier.display_name = Some("Colour".into());
    modifier.kind = Some("dropdown".into());
    modifier.required = true;

    let data = mapper.writable_field_values(&modifier, &Map::new());
    assert_eq!(
        Value::Object(data),
        json!({"display_name": "Colour", "type": "dropdown", "required": true})
    );

    let overrides = object(json!({"sort_order": 2}));
    let data = mapper.writable_field_values(&modifier, &overrides);
    assert_eq!(data["sort_order"], json!(2));
}

#[test]
fn test_check_property_values() {
    let mapper = Mapper::new();
    let product = Product::default();
    assert!(mapper.check_none_readonly_data(&product, &object(json!({"name": "x", "type": "physical"}))));
    assert!(!mapper.check_none_readonly_data(&product, &object(json!({"date_created": "x"}))));
    assert!(!mapper.check_none_readonly_data(&product, &object(json!({"colour": "red"}))));
    assert!(!mapper.check_none_readonly_data(&product, &Map::new()));
}

#[test]
fn test_new_object_by_name() {
    let (_, em) = manager();
    let entity = em.new_object("Product", &json!({"id": 5, "name": "Lamp"})).unwrap();
    let product = entity.as_any().downcast_ref::<Product>().unwrap();
    assert_eq!(product.id, None);
    assert_eq!(product.name.as_deref(), Some("Lamp"));

    let err = em.new_object("Widget", &json!({})).unwrap_err();
    assert_eq!(err, OrmError::Mapper(MapperError::UnknownEntity("Widget".into())));
    let err = em.new_object(" ", &json!({})).unwrap_err();
    assert_eq!(err, OrmError::Entity(EntityError::EmptyClassName));
}

// ── Reads ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_find_embeds_includes_and_auto_loads_modifiers() {
    let (mock, em) = manager();
    mock.push(
        CallKind::Find,
        json!({
            "id": 7,
            "name": "Lamp",
            "images": [{"id": 1, "product_id": 7, "url_zoom": "https://cdn/zoom.jpg"}]
        }),
    );
    mock.route(
        CallKind::FindAll,
        "/catalog/products/7/modifiers",
        json!([{
            "id": 3,
            "product_id": 7,
            "display_name": "Colour",
            "type": "dropdown",
            "option_values": [{"id": 9, "label": "Red", "is_default": true}]
        }]),
    );

    let product = em.find::<Product>(7, Parent::None, true).await.unwrap().unwrap();

    assert_eq!(
        mock.paths(),
        vec![
            "/catalog/products?id:in=7&include=images".to_string(),
            "/catalog/products/7/modifiers".to_string(),
        ]
    );
    assert_eq!(product.id, Some(7));
    assert_eq!(product.images.len(), 1);
    assert_eq!(product.images[0].url_zoom.as_deref(), Some("https://cdn/zoom.jpg"));
    assert_eq!(product.modifiers.len(), 1);
    let modifier = &product.modifiers[0];
    assert_eq!(modifier.product_id, Some(7));
    assert_eq!(modifier.kind.as_deref(), Some("dropdown"));
    assert_eq!(modifier.option_values[0].label.as_deref(), Some("Red"));
    assert!(modifier.option_values[0].is_default);
    assert!(product.reviews.is_empty());
}

#[tokio::test]
async fn test_find_without_auto_makes_one_call() {
    let (mock, em) = manager();
    mock.push(CallKind::Find, json!({"id": 7, "name": "Lamp"}));

    let product = em.find::<Product>(7, Parent::None, false).await.unwrap().unwrap();
    assert_eq!(product.name.as_deref(), Some("Lamp"));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_find_blank_result_is_none() {
    let (mock, em) = manager();
    assert!(em.find::<Product>(404, Parent::None, true).await.unwrap().is_none());
    assert_eq!(mock.call_count(), 1);

    let err = em.find::<Product>(0, Parent::None, false).await.unwrap_err();
    assert_eq!(err, OrmError::Entity(EntityError::InvalidId));
    assert_eq!(mock.call_count(), 1);
}

#[tokio::test]
async fn test_find_nested_with_parent_id() {
    let (mock, em) = manager();
    mock.push(CallKind::Find, json!({"id": 2, "product_id": 111, "title": "Great"}));

    let review = em
        .find::<ProductReview>(2, Parent::id(111), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(review.title.as_deref(), Some("Great"));
    assert_eq!(mock.paths(), vec!["/catalog/products/111/reviews?id:in=2".to_string()]);

    let err = em.find::<ProductReview>(2, Parent::None, false).await.unwrap_err();
    assert!(matches!(err, OrmError::Mapper(MapperError::UnresolvedPath { .. })));
}

#[tokio::test]
async fn test_find_all_and_find_by() {
    let (mock, em) = manager();
    mock.push(CallKind::FindAll, json!([{"id": 1, "name": "A"}, "junk", {"id": 2, "name": "B"}]));
    mock.push(CallKind::FindBy, json!([{"id": 2, "name": "B"}]));

    let all = em
        .find_all::<Product>(Parent::None, Some(("name", false)), false)
        .await
        .unwrap();
    assert_eq!(all.len(), 2);

    let query = bcorm_data::QueryBuilder::new().where_in("id", &[2]).where_like("name", "B");
    let some = em.find_by::<Product>(Parent::None, query, false).await.unwrap();
    assert_eq!(some[0].id, Some(2));

    assert_eq!(
        mock.paths(),
        vec![
            "/catalog/products?sort=name&direction=desc&include=images".to_string(),
            "/catalog/products?id:in=2&name:like=B&include=images".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_count_nested() {
    let (mock, em) = manager();
    mock.push(CallKind::Count, json!(12));
    assert_eq!(em.count::<ProductReview>(Parent::id(111)).await.unwrap(), 12);
    assert_eq!(mock.last_call().unwrap().path, "/catalog/products/111/reviews");
}

#[tokio::test]
async fn test_reads_with_named_parent_params() {
    let (mock, em) = manager();
    mock.route(
        CallKind::FindAll,
        "/catalog/products/111/modifiers/7/values",
        json!([{"id": 1, "label": "Red"}, {"id": 2, "label": "Blue"}]),
    );
    mock.push(CallKind::Find, json!({"id": 2, "label": "Blue"}));
    mock.push(CallKind::Count, json!(2));
    let parent = Parent::params([("product_id", 111), ("modifier_id", 7)]);

    let values = em
        .find_all::<ProductModifierValue>(parent.clone(), None, false)
        .await
        .unwrap();
    assert_eq!(values.len(), 2);
    assert_eq!(values[1].label.as_deref(), Some("Blue"));

    let value = em
        .find::<ProductModifierValue>(2, parent.clone(), false)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(value.id, Some(2));
    assert_eq!(em.count::<ProductModifierValue>(parent).await.unwrap(), 2);

    assert_eq!(
        mock.paths(),
        vec![
            "/catalog/products/111/modifiers/7/values".to_string(),
            "/catalog/products/111/modifiers/7/values?id:in=2".to_string(),
            "/catalog/products/111/modifiers/7/values".to_string(),
        ]
    );
}

#[tokio::test]
async fn test_single_parent_id_cannot_fill_two_placeholders() {
    let (mock, em) = manager();
    let err = em
        .find_all::<ProductModifierValue>(Parent::id(7), None, false)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        OrmError::Mapper(MapperError::UnresolvedPath {
            path: "/catalog/products/{product_id}/modifiers/{modifier_id}/values".into(),
            param: "product_id".into(),
        })
    );

    // Entity fields and named params combine.
    let mut value = ProductModifierValue::default();
    value.product_id = Some(111);
    assert_eq!(
        em.mapper()
            .resource_path(&value, &Parent::params([("modifier_id", 7)]))
            .unwrap(),
        "/catalog/products/111/modifiers/7/values"
    );
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_repository_with_parent_params() {
    let (mock, em) = manager();
    let repository = em
        .repository::<ProductModifierValue>()
        .with_parent(Parent::params([("product_id", 111), ("modifier_id", 7)]));
    assert!(repository.find_all().await.unwrap().is_empty());
    assert_eq!(mock.paths(), vec!["/catalog/products/111/modifiers/7/values".to_string()]);
}

#[tokio::test]
async fn test_repository_paged() {
    let (mock, em) = manager();
    mock.push(CallKind::Count, json!(3));
    mock.push(
        CallKind::FindBy,
        json!([{"id": 1, "title": "Great"}, {"id": 2, "title": "Meh"}]),
    );

    let repository = em.repository::<ProductReview>().under(111);
    let page = repository.find_all_paged(&Pageable::new(1, 2)).await.unwrap();
    assert_eq!(page.content.len(), 2);
    assert_eq!(page.total_elements, 3);
    assert_eq!(page.total_pages, 2);
    assert!(page.has_next());
    assert_eq!(
        mock.paths(),
        vec![
            "/catalog/products/111/reviews".to_string(),
            "/catalog/products/111/reviews?page=1&limit=2".to_string(),
        ]
    );
}

// ── Relation handlers ──────────────────────────────────────────────────

#[tokio::test]
async fn test_has_many_api_relation_by_target_field() {
    let (mock, em) = manager();
    mock.route(
        CallKind::FindBy,
        "/customers/addresses",
        json!([{"id": 1, "customer_id": 5, "city": "Austin"}]),
    );

    let mut customer = Customer::default();
    let relation = Customer::entity_descriptor()
        .relation_by_property("addresses")
        .unwrap();
    HasManyHandler
        .handle(&em, &mut customer, relation, &json!({"id": 5}), &Parent::None)
        .await
        .unwrap();

    assert_eq!(mock.paths(), vec!["/customers/addresses?customer_id:in=5".to_string()]);
    assert_eq!(customer.addresses.len(), 1);
    assert_eq!(customer.addresses[0].city.as_deref(), Some("Austin"));
}

#[tokio::test]
async fn test_has_many_rejects_nested_map() {
    let (mock, em) = manager();
    let mut customer = Customer::default();
    let relation = Customer::entity_descriptor()
        .relation_by_property("addresses")
        .unwrap();

    let err = HasManyHandler
        .handle(&em, &mut customer, relation, &json!({"id": {"nested": 1}}), &Parent::None)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        OrmError::Handler(HandlerError::InvalidManyRelationValue(_))
    ));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_has_many_missing_link_is_noop() {
    let (mock, em) = manager();
    let mut customer = Customer::default();
    let relation = Customer::entity_descriptor()
        .relation_by_property("addresses")
        .unwrap();
    HasManyHandler
        .handle(&em, &mut customer, relation, &json!({"email": "a@b.co"}), &Parent::None)
        .await
        .unwrap();
    assert_eq!(mock.call_count(), 0);
}

// ── Writes ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_save_creates_then_updates() {
    let (mock, em) = manager();
    mock.push(CallKind::Create, json!({"id": 21, "name": "Lamp", "date_created": "2024-05-01"}));

    let mut product = Product::default();
    product.name = Some("Lamp".into());
    product.price = Some(10.0);
    assert!(em.save(&mut product).await.unwrap());
    assert_eq!(product.id, Some(21));
    assert!(product.is_new());

    let create = mock.last_call().unwrap();
    assert_eq!(create.path, "/catalog/products");
    assert_eq!(create.data, Some(json!({"name": "Lamp", "price": 10.0})));

    product.price = Some(12.0);
    assert!(em.save(&mut product).await.unwrap());
    assert!(!product.is_new());
    let update = mock.last_call().unwrap();
    assert_eq!(update.kind, CallKind::Update);
    assert_eq!(update.path, "/catalog/products/21");
    assert_eq!(update.data, Some(json!({"name": "Lamp", "price": 12.0})));
}

#[tokio::test]
async fn test_save_missing_required_field() {
    let (mock, em) = manager();
    let mut product = Product::default();
    product.price = Some(10.0);
    let err = em.save(&mut product).await.unwrap_err();
    assert_eq!(err, OrmError::Entity(EntityError::RequiredFields(vec!["name".into()])));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_save_invalid_email_makes_no_call() {
    let (mock, em) = manager();
    let mut customer = Customer::default();
    customer.email = Some("kenngo".into());
    customer.first_name = Some("Ken".into());
    customer.last_name = Some("Ngo".into());

    let err = em.save(&mut customer).await.unwrap_err();
    assert_eq!(
        err,
        OrmError::Entity(EntityError::RequiredValidations(vec!["email: Email".into()]))
    );
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_save_invalid_date() {
    let (mock, em) = manager();
    let mut review = ProductReview::default();
    review.product_id = Some(111);
    review.title = Some("Great".into());
    review.date_reviewed = Some("yesterday".into());

    let err = em.save(&mut review).await.unwrap_err();
    assert!(matches!(err, OrmError::Entity(EntityError::RequiredValidations(_))));

    review.date_reviewed = Some("2024-05-01T10:00:00+00:00".into());
    assert!(em.save(&mut review).await.unwrap());
    let call = mock.last_call().unwrap();
    assert_eq!(call.path, "/catalog/products/111/reviews");
    assert!(call.data.unwrap().get("product_id").is_none());
}

#[tokio::test]
async fn test_update_with_empty_data_makes_no_call() {
    let (mock, em) = manager();
    let mut product: Product = em
        .mapper()
        .patch_new(&json!({"id": 7, "name": "Lamp"}), true)
        .unwrap();

    assert!(em.update(&mut product, Map::new()).await.unwrap());
    assert!(em
        .update(&mut product, object(json!({"date_created": "2024-01-01"})))
        .await
        .unwrap());
    assert_eq!(mock.call_count(), 0);

    let mut unsaved = Product::default();
    let err = em
        .update(&mut unsaved, object(json!({"price": 1})))
        .await
        .unwrap_err();
    assert_eq!(err, OrmError::Entity(EntityError::InvalidId));
}

#[tokio::test]
async fn test_update_sends_only_given_data() {
    let (mock, em) = manager();
    let mut product: Product = em
        .mapper()
        .patch_new(&json!({"id": 7, "name": "Lamp", "price": 10}), true)
        .unwrap();

    assert!(em.update(&mut product, object(json!({"price": 9.5}))).await.unwrap());
    let call = mock.last_call().unwrap();
    assert_eq!(call.path, "/catalog/products/7");
    assert_eq!(call.data, Some(json!({"price": 9.5})));
    assert_eq!(product.price, Some(9.5));
    assert_eq!(product.name.as_deref(), Some("Lamp"));
}

#[tokio::test]
async fn test_create_with_upload_file() {
    let (mock, em) = manager();
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"\x89PNG").unwrap();
    let location = file.path().to_string_lossy().into_owned();

    mock.push(
        CallKind::Create,
        json!({"id": 55, "product_id": 7, "url_zoom": "https://cdn/55.jpg"}),
    );

    let mut image = ProductImage::default();
    image.product_id = Some(7);
    image.is_thumbnail = Some(true);
    image.image_file = Some(location.clone());
    assert!(em.create(&mut image).await.unwrap());

    let call = mock.last_call().unwrap();
    assert_eq!(call.path, "/catalog/products/7/images");
    assert_eq!(call.data, Some(json!({"is_thumbnail": true})));
    assert_eq!(call.files.len(), 1);
    assert_eq!(call.files[0].field, "image_file");
    assert_eq!(call.files[0].path, file.path());
    assert_eq!(image.id, Some(55));
    assert_eq!(image.url_zoom.as_deref(), Some("https://cdn/55.jpg"));
}

#[tokio::test]
async fn test_create_upload_file_must_exist() {
    let (mock, em) = manager();
    let mut image = ProductImage::default();
    image.product_id = Some(7);
    image.image_file = Some("/definitely/not/here.png".into());

    let err = em.create(&mut image).await.unwrap_err();
    assert_eq!(
        err,
        OrmError::Entity(EntityError::InvalidUploadFile("/definitely/not/here.png".into()))
    );
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_create_without_writable_data() {
    let (mock, em) = manager();
    let mut image = ProductImage::default();
    image.product_id = Some(7);

    let err = em.create(&mut image).await.unwrap_err();
    assert_eq!(err, OrmError::Entity(EntityError::EmptyWritableData));
    assert_eq!(mock.call_count(), 0);
}

#[tokio::test]
async fn test_blank_create_response_is_false() {
    let (mock, em) = manager();
    mock.push(CallKind::Create, Value::Null);
    let mut product = Product::default();
    product.name = Some("Lamp".into());
    assert!(!em.create(&mut product).await.unwrap());
    assert_eq!(product.id, None);
}

#[tokio::test]
async fn test_client_error_propagates() {
    let (mock, em) = manager();
    mock.push_error(
        CallKind::Create,
        bcorm_data::ClientError::Status {
            status: 422,
            body: "{\"title\":\"The field 'name' is invalid.\"}".into(),
        },
    );
    let mut product = Product::default();
    product.name = Some("Lamp".into());
    let err = em.create(&mut product).await.unwrap_err();
    assert!(matches!(
        err,
        OrmError::Client(bcorm_data::ClientError::Status { status: 422, .. })
    ));
}

#[tokio::test]
async fn test_delete_by_id() {
    let (mock, em) = manager();
    let mut review = ProductReview::default();
    review.product_id = Some(111);
    review.id = Some(2);
    assert!(em.delete(&review, None).await.unwrap());
    assert_eq!(mock.last_call().unwrap().path, "/catalog/products/111/reviews/2");

    let err = em.delete(&Product::default(), None).await.unwrap_err();
    assert_eq!(err, OrmError::Entity(EntityError::InvalidId));
}

// ── Events ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_lifecycle_events_are_dispatched() {
    let mock = MockClient::shared();
    let bus = EventBus::new();
    let seen: Arc<Mutex<Vec<(String, Option<String>)>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = seen.clone();
    bus.subscribe(move |event: Arc<EntityManagerEvent>| {
        let sink = sink.clone();
        async move {
            let email = event.entity_as::<Customer>().and_then(|c| c.email.clone());
            sink.lock().unwrap().push((event.name().to_string(), email));
        }
    })
    .await;

    let em = EntityManager::new(mock.clone()).with_event_dispatcher(Arc::new(bus.clone()));
    assert!(em.has_event_dispatcher());

    mock.push(CallKind::Create, json!({"id": 4, "email": "ken@example.com"}));
    let mut customer = Customer::default();
    customer.email = Some("ken@example.com".into());
    customer.first_name = Some("Ken".into());
    customer.last_name = Some("Ngo".into());
    em.save(&mut customer).await.unwrap();

    em.update(&mut customer, object(json!({"email": "ngo@example.com"})))
        .await
        .unwrap();

    let seen = seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![
            ("entity.created".to_string(), Some("ken@example.com".to_string())),
            ("entity.updated".to_string(), Some("ngo@example.com".to_string())),
        ]
    );
}

#[tokio::test]
async fn test_no_events_on_failed_write() {
    let mock = MockClient::shared();
    let bus = EventBus::new();
    let count = Arc::new(Mutex::new(0usize));
    let c = count.clone();
    bus.subscribe(move |_: Arc<EntityManagerEvent>| {
        let c = c.clone();
        async move {
            *c.lock().unwrap() += 1;
        }
    })
    .await;

    let em = EntityManager::new(mock.clone()).with_event_dispatcher(Arc::new(bus));
    let mut customer = Customer::default();
    customer.email = Some("kenngo".into());
    customer.first_name = Some("Ken".into());
    customer.last_name = Some("Ngo".into());
    assert!(em.save(&mut customer).await.is_err());
    assert_eq!(*count.lock().unwrap(), 0);
}
