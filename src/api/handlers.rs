//! JSON handlers for the automation endpoints.
//!
//! Each handler takes the shared [`ApiContext`] and the routed request,
//! validates input, issues one library command and shapes the result.

use serde_json::json;

use crate::api::payloads::{self, AddPapers, Identifiers, NewCollection, NewComment, SetFlag, UpdateTags};
use crate::api::ApiContext;
use crate::http::error::ApiError;
use crate::http::response::{Response, StatusCode};
use crate::identifier::classify;
use crate::library::PaperQuery;
use crate::routing::{HandlerResult, RouteRequest};

pub async fn status(ctx: ApiContext, _req: RouteRequest) -> HandlerResult {
    let status = ctx.library.status().await?;
    Ok(Response::ok(
        StatusCode::Ok,
        &json!({
            "version": env!("CARGO_PKG_VERSION"),
            "port": ctx.info.port(),
            "papers": status.papers,
            "collections": status.collections,
            "tags": status.tags,
        }),
    ))
}

pub async fn identify(_ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let raw = req
        .request()
        .query("q")
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| ApiError::missing_field("q"))?;
    let id = classify(raw);
    Ok(Response::ok(
        StatusCode::Ok,
        &json!({ "kind": id.kind(), "value": id.value() }),
    ))
}

pub async fn search_papers(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let request = req.request();
    let limit = match request.query("limit") {
        None => None,
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(n) if n > 0 => Some(n),
            _ => return Err(ApiError::BadRequest("Invalid limit".into())),
        },
    };
    let query = PaperQuery {
        text: request
            .query("q")
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(String::from),
        limit,
    };

    let papers = ctx.library.search_papers(&query).await?;
    Ok(Response::ok(
        StatusCode::Ok,
        &json!({ "count": papers.len(), "papers": papers }),
    ))
}

pub async fn add_papers(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let (ids, collection) = req.request().json::<AddPapers>()?.validate()?;
    let outcome = ctx.library.add_papers(&ids, collection).await?;
    let status = if outcome.added > 0 {
        StatusCode::Created
    } else {
        StatusCode::Ok
    };
    Ok(Response::ok(status, &outcome))
}

pub async fn delete_papers(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let ids = req.request().json::<Identifiers>()?.validate()?;
    let deleted = ctx.library.delete_papers(&ids).await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "deleted": deleted })))
}

pub async fn update_tags(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let (ids, action, tag) = req.request().json::<UpdateTags>()?.validate()?;
    let updated = ctx.library.update_tags(&ids, action, &tag).await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "updated": updated })))
}

pub async fn set_read(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let (ids, read) = req.request().json::<SetFlag>()?.validate("read")?;
    let updated = ctx.library.set_read(&ids, read).await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "updated": updated })))
}

pub async fn set_starred(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let (ids, starred) = req.request().json::<SetFlag>()?.validate("starred")?;
    let updated = ctx.library.set_starred(&ids, starred).await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "updated": updated })))
}

pub async fn paper(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let id = classify(req.param()?);
    let paper = ctx.library.paper(&id).await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "paper": paper })))
}

pub async fn comments(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let id = classify(req.param()?);
    let comments = ctx.library.comments(&id).await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "comments": comments })))
}

pub async fn add_comment(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let id = classify(req.param()?);
    let (text, author) = req.request().json::<NewComment>()?.validate()?;
    let comment = ctx.library.add_comment(&id, &text, author.as_deref()).await?;
    Ok(Response::ok(StatusCode::Created, &json!({ "comment": comment })))
}

pub async fn annotations(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let id = classify(req.param()?);
    let annotations = ctx.library.annotations(&id).await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "annotations": annotations })))
}

pub async fn collections(ctx: ApiContext, _req: RouteRequest) -> HandlerResult {
    let collections = ctx.library.collections().await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "collections": collections })))
}

pub async fn create_collection(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let name = req.request().json::<NewCollection>()?.validate()?;
    let collection = ctx.library.create_collection(&name).await?;
    Ok(Response::ok(StatusCode::Created, &json!({ "collection": collection })))
}

pub async fn delete_collection(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let id = payloads::collection_id(req.param()?)?;
    ctx.library.delete_collection(id).await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "deleted": true })))
}

pub async fn collection_papers(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let id = payloads::collection_id(req.param()?)?;
    let papers = ctx.library.collection_papers(id).await?;
    Ok(Response::ok(
        StatusCode::Ok,
        &json!({ "count": papers.len(), "papers": papers }),
    ))
}

pub async fn add_to_collection(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let id = payloads::collection_id(req.param()?)?;
    let ids = req.request().json::<Identifiers>()?.validate()?;
    let added = ctx.library.add_to_collection(id, &ids).await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "added": added })))
}

pub async fn remove_from_collection(ctx: ApiContext, req: RouteRequest) -> HandlerResult {
    let id = payloads::collection_id(req.param()?)?;
    let ids = req.request().json::<Identifiers>()?.validate()?;
    let removed = ctx.library.remove_from_collection(id, &ids).await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "removed": removed })))
}

pub async fn tags(ctx: ApiContext, _req: RouteRequest) -> HandlerResult {
    let tags = ctx.library.tags().await?;
    Ok(Response::ok(StatusCode::Ok, &json!({ "tags": tags })))
}
