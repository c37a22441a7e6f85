use starlite_rust::prelude::*;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Item {
    id: i64,
    name: String,
}

async fn get_item(_ctx: RequestContext, req: Request) -> Result<Json<Item>, Error> {
    let id = req
        .path_params()
        .get_int("item_id")
        .ok_or_else(|| HttpError::bad_request().with_detail("item_id missing"))?;
    Ok(Json(Item {
        id,
        name: format!("item-{id}"),
    }))
}

async fn create_item(_ctx: RequestContext, mut req: Request) -> Result<(u16, Json<Item>), Error> {
    let item: Item = req.json().await?;
    Ok((201, Json(item)))
}

fn app() -> App {
    let items = Router::new("/items")
        .route(RouteHandler::get("/{item_id:int}", get_item).name("get_item"))
        .route(RouteHandler::post("/", create_item).name("create_item"));
    App::builder()
        .config(AppConfig::new().name("quickstart"))
        .include(Router::new("/api").include(items))
        .build()
        .unwrap()
}

#[test]
fn get_and_create() {
    let client = TestClient::new(app());

    let fetched = client.get("/api/items/5").send();
    assert_eq!(fetched.status(), 200);
    assert_eq!(
        fetched.json::<Item>().unwrap(),
        Item {
            id: 5,
            name: "item-5".into()
        }
    );

    let created = client
        .post("/api/items")
        .json(&Item {
            id: 1,
            name: "new".into(),
        })
        .send();
    assert_eq!(created.status(), 201);
    assert_eq!(created.json::<Item>().unwrap().name, "new");

    let invalid = client.post("/api/items").body("{not json").send();
    assert_eq!(invalid.status(), 400);
}

#[test]
fn routes_and_reverse_lookup() {
    let app = app();
    let kinds: Vec<_> = app.routes().iter().map(|r| (r.kind, r.path.as_str())).collect();
    assert_eq!(
        kinds,
        vec![
            (starlite_rust::HandlerKind::Http(Method::Get), "/api/items/{item_id}"),
            (starlite_rust::HandlerKind::Http(Method::Post), "/api/items"),
        ]
    );
    assert_eq!(app.url_for("get_item", &[("item_id", "12")]).unwrap(), "/api/items/12");
    assert_eq!(app.url_for("create_item", &[]).unwrap(), "/api/items");
}
