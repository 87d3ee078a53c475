use crate::infra::{InMemoryDraftStore, InMemoryEntityStore};
use clap::Args;
use marketplace_flow::error::AppError;
use marketplace_flow::flows::{
    BusinessCategory, DraftMirror, FieldMap, FlowKind, FlowProgress, FlowServiceError,
    FlowSessionService, FlowSessionView, MirroredGateway, SessionId,
};
use serde_json::json;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Business category picked in the prelude (e.g. catering, retail).
    #[arg(long, value_parser = parse_category)]
    pub(crate) category: Option<BusinessCategory>,
    /// Print the final session view as JSON after each step.
    #[arg(long)]
    pub(crate) json: bool,
}

fn parse_category(raw: &str) -> Result<BusinessCategory, String> {
    BusinessCategory::from_key(raw).ok_or_else(|| {
        let known: Vec<&str> = BusinessCategory::ordered()
            .into_iter()
            .map(BusinessCategory::key)
            .collect();
        format!("unknown category '{raw}' (expected one of: {})", known.join(", "))
    })
}

type DemoGateway = MirroredGateway<InMemoryEntityStore, InMemoryDraftStore>;

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let category = args.category.unwrap_or(BusinessCategory::Catering);
    let drafts = DraftMirror::new(Arc::new(InMemoryDraftStore::default()));
    let gateway = Arc::new(MirroredGateway::new(
        Arc::new(InMemoryEntityStore::default()),
        Some(drafts.clone()),
    ));
    let service = FlowSessionService::new(gateway, 4);

    println!("Marketplace flow demo: Business Card");
    println!("====================================");

    let opened = service.open_create(FlowKind::BusinessCard)?;
    let id = opened.session_id.clone();
    print_view("Opened", &opened, args.json);

    let selected = service.select_category(&id, category)?;
    if let Some(prelude) = &selected.prelude {
        if let Some(confirmation) = &prelude.confirmation {
            println!("  {}", confirmation);
        }
    }
    let started = service.get_started(&id)?;
    print_view("Get started", &started, args.json);

    step(&service, &id, "Years in business", years(), args.json).await?;

    println!("\n> Continue with an empty business name");
    match service.next(&id).await {
        Err(FlowServiceError::Validation(report)) => {
            println!("  Blocked on step {}:", report.step);
            for issue in &report.issues {
                println!("    - {}", issue.message);
            }
        }
        Ok(_) => println!("  Unexpectedly advanced"),
        Err(err) => return Err(err.into()),
    }

    step(&service, &id, "Business info", info(category), args.json).await?;

    println!("\n> Jump back to step 1 and forward to review");
    service.jump(&id, 1)?;
    let review = service.jump(&id, 3)?;
    print_view("Jumped", &review, args.json);

    println!("\n> Submit");
    match service.next(&id).await? {
        FlowProgress::Completed { entity, .. } => {
            println!("  Saved {} ({})", entity.id, entity.kind.label());
            match serde_json::to_string_pretty(&entity.fields) {
                Ok(json) => println!("  Entity:\n{}", json),
                Err(err) => println!("  Entity unavailable: {}", err),
            }
        }
        FlowProgress::Active(view) => print_view("Still open", &view, args.json),
    }

    match drafts.restore(FlowKind::BusinessCard) {
        Some(draft) => println!("  Draft mirror holds {}", draft.id),
        None => println!("  Draft mirror is empty"),
    }

    Ok(())
}

async fn step(
    service: &FlowSessionService<DemoGateway>,
    id: &SessionId,
    label: &str,
    fields: FieldMap,
    as_json: bool,
) -> Result<(), AppError> {
    println!("\n> {label}");
    service.update_data(id, fields)?;
    match service.next(id).await? {
        FlowProgress::Active(view) => print_view("Continued", &view, as_json),
        FlowProgress::Completed { entity, .. } => println!("  Completed early as {}", entity.id),
    }
    Ok(())
}

fn print_view(action: &str, view: &FlowSessionView, as_json: bool) {
    if let Some(prelude) = &view.prelude {
        println!(
            "  {action}: {} prelude ({})",
            prelude.kind_label,
            prelude.state.label()
        );
    }
    if let Some(flow) = &view.flow {
        println!("  {action}: {}", flow.header);
        let sidebar: Vec<String> = flow
            .steps
            .iter()
            .map(|step| format!("{} [{}]", step.title, step.state.label()))
            .collect();
        println!("    Steps: {}", sidebar.join(" | "));
        println!(
            "    Footer: back={} continue={} ({})",
            flow.navigation.can_go_back, flow.navigation.can_continue, flow.navigation.continue_label
        );
    }
    if as_json {
        match serde_json::to_string_pretty(view) {
            Ok(json) => println!("{}", json),
            Err(err) => println!("  View unavailable: {}", err),
        }
    }
}

fn years() -> FieldMap {
    object(json!({ "yearsInBusiness": 7, "foundedYear": 2018 }))
}

fn info(category: BusinessCategory) -> FieldMap {
    object(json!({
        "name": format!("Northside {}", category.label()),
        "location": "Ghent",
        "description": format!("Family-run {} business.", category.label().to_lowercase()),
        "teamSize": "6-20",
    }))
}

fn object(value: serde_json::Value) -> FieldMap {
    match value {
        serde_json::Value::Object(map) => map,
        _ => FieldMap::new(),
    }
}
