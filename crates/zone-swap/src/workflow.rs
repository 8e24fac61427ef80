//! Interactive sessions: the operator dialogue wrapped around the engine.

use std::io::{BufRead, Write};
use std::ops::ControlFlow;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::{info, warn};

use pan_api::{ApiClient, ApiError, PanClient};
use pan_xml::{ConfigDocument, DeviceType};
use zone_engine::{
    apply_additions, apply_removals, apply_to_document, build_plan, find_matches, ApplyError,
    MatchSet, RemovalOutcome, RemovalStatus, RuleRecord, RulebaseCategory, RulebasePosition,
    RulebaseScope, ZonePattern,
};

use crate::config::Config;
use crate::console::Console;
use crate::validate;

const NO_POLICIES: &str = "\n\nThere were no policies in the rulebase chosen, try again...";

/// The replacement zone and the rules it will be written into.
#[derive(Debug)]
pub struct Search {
    pub replacement: String,
    pub matches: MatchSet,
}

// ---------------------------------------------------------------------------
// Live mode
// ---------------------------------------------------------------------------

/// Log in to a device and run edit passes against it until the operator is
/// done.
pub async fn run_live<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    cfg: &Config,
    host: Option<&str>,
    user: Option<&str>,
) -> Result<()> {
    let host = match host {
        Some(h) if validate::is_valid_host(h) => h.to_string(),
        Some(h) => bail!("'{h}' is not a valid IP address or FQDN"),
        None => prompt_host(console)?,
    };
    let api = ApiClient::new(&host, &cfg.api.settings()).context("failed to set up API client")?;
    let key = login(console, &api, user).await?;
    let client = api.authenticate(key);
    run_session(console, &client).await
}

/// Edit passes against an authenticated device.
pub async fn run_session<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &PanClient,
) -> Result<()> {
    let device = client
        .device_type()
        .await
        .context("failed to detect device type")?;
    announce_device(console, device)?;

    loop {
        let groups = match device {
            DeviceType::Panorama => client
                .device_groups()
                .await
                .context("failed to list device groups")?,
            DeviceType::Firewall => Vec::new(),
        };
        let scope = select_scope(console, device, &groups)?;
        let rules = client
            .rules(&scope)
            .await
            .with_context(|| format!("failed to read the {scope}"))?;
        if rules.is_empty() {
            console.say(NO_POLICIES)?;
            continue;
        }

        let search = prompt_search(console, &rules)?;
        if push_live(console, client, &scope, &search).await? {
            console.say(format!(
                "\n\n\nCongrats, all zones have been replaced in the {} rulebase!",
                scope.category
            ))?;
        }

        if !console.confirm("\n\nWould you like to run this script again for the same PAN device? [Y/n]  ")? {
            console.say("\n\n\nHave a great day!!\n\n")?;
            return Ok(());
        }
    }
}

fn prompt_host<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<String> {
    loop {
        let host = console.ask("\nPlease enter Panorama/firewall IP or FQDN: ")?;
        if validate::is_valid_host(host.trim()) {
            return Ok(host.trim().to_string());
        }
        console.say("\nThere was something wrong with your entry. Please try again...\n")?;
    }
}

/// Prompt for credentials until the device hands out an API key. An
/// unreachable device ends the run.
async fn login<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    api: &ApiClient,
    mut preset_user: Option<&str>,
) -> Result<String> {
    loop {
        let username = match preset_user.take() {
            Some(user) if validate::is_valid_username(user) => user.to_string(),
            _ => prompt_username(console)?,
        };
        let password = console.secret("Please enter your password: ")?;

        match api.generate_key(&username, &password).await {
            Ok(key) => return Ok(key),
            Err(err @ ApiError::Connect { .. }) => {
                console.say(
                    "\nThere was a problem connecting to the firewall. Please check the address and try again...\n",
                )?;
                return Err(err).context("failed to reach the device");
            }
            Err(ApiError::Rejected { message, .. }) => {
                warn!(user = %username, %message, "login rejected");
                console.say(
                    "\nYou have entered an incorrect username or password. Please try again...\n",
                )?;
            }
            Err(err) => return Err(err).context("API key generation failed"),
        }
    }
}

fn prompt_username<R: BufRead, W: Write>(console: &mut Console<R, W>) -> Result<String> {
    loop {
        let user = console.ask("Please enter your user name: ")?;
        if validate::is_valid_username(&user) {
            return Ok(user);
        }
        console.say("\nThere was something wrong with your entry. Please try again...\n")?;
    }
}

/// Push the replacement through the API: every additive chunk first, then
/// one delete per old zone. Returns whether every old zone was removed.
pub async fn push_live<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    client: &PanClient,
    scope: &RulebaseScope,
    search: &Search,
) -> Result<bool> {
    let plan = build_plan(
        &search.matches,
        &search.replacement,
        client.set_overhead(scope),
    )
    .context("failed to plan the zone changes")?;
    info!(
        chunks = plan.add_chunks().len(),
        removals = plan.removal_count(),
        %scope,
        "plan ready"
    );

    console.pause(
        "\n\nHit Enter to push the new zone to the policies that matched (or CTRL+C to exit the script)... ",
    )?;
    console.say("\nPolicy changes being pushed, please be patient...")?;
    if let Err(err) = apply_additions(&plan, scope, client).await {
        if let ApplyError::ChunkRejected { source, .. } = &err {
            console.say(format!(
                "\n\nThere was an issue with an API call, below is the faulty call...\n\n{}\n",
                source.request
            ))?;
        }
        return Err(err).context("failed to add the new zone; no old zones were removed");
    }
    console.say("\n\n...Done...")?;

    console.pause(&format!(
        "\n\nThere are {} zones that need to be removed from the {} matching policies. \
         Each zone is removed by a separate API call\n\
         Please be aware that this could have an impact on the management plane of your PAN device\n\n\
         Hit Enter to push the API calls to remove the old zones from the policies that matched \
         (or CTRL+C to exit the script)... ",
        plan.removal_count(),
        plan.rule_count()
    ))?;
    console.say("")?;

    let mut console_error = None;
    let report = {
        let mut observer = |outcome: &RemovalOutcome| match report_removal(console, outcome) {
            Ok(flow) => flow,
            Err(err) => {
                console_error = Some(err);
                ControlFlow::Break(())
            }
        };
        apply_removals(&plan, scope, client, &mut observer).await
    };
    if let Some(err) = console_error {
        return Err(err);
    }

    if report.halted {
        console.say(format!(
            "\n\nStopped after {} of {} removals.",
            report.outcomes.len(),
            plan.removal_count()
        ))?;
    } else if report.failed() > 0 {
        console.say(format!(
            "\n\n{} of {} old zones could not be removed; run again to retry them.",
            report.failed(),
            plan.removal_count()
        ))?;
    }
    Ok(!report.halted && report.failed() == 0)
}

fn report_removal<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    outcome: &RemovalOutcome,
) -> Result<ControlFlow<()>> {
    match &outcome.status {
        RemovalStatus::Removed => {
            console.say(format!(
                "Policy Name: {} - Old zone successfully removed",
                outcome.rule
            ))?;
            Ok(ControlFlow::Continue(()))
        }
        RemovalStatus::Failed(err) => {
            console.say(format!(
                "\n\nThere was an issue with the API call for {}, below is the faulty call...\n\n{}\n\n{}\n",
                outcome.rule, err.request, err.message
            ))?;
            let answer =
                console.ask("\n\nHit Enter to continue removing zones (or type 'q' to stop)... ")?;
            if answer.trim().eq_ignore_ascii_case("q") {
                Ok(ControlFlow::Break(()))
            } else {
                Ok(ControlFlow::Continue(()))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Offline mode
// ---------------------------------------------------------------------------

/// Edit an exported configuration once and write the result beside it.
pub fn run_offline<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    cfg: &Config,
    path: &Path,
) -> Result<()> {
    let mut doc = ConfigDocument::load(path)
        .with_context(|| format!("failed to load configuration {}", path.display()))?;
    console.say("\n\n...Device config loaded from command argument...")?;
    let device = doc.device_type();
    announce_device(console, device)?;

    loop {
        let scope = select_scope(console, device, &doc.device_groups())?;
        let rules = doc.rules(&scope);
        if rules.is_empty() {
            console.say(NO_POLICIES)?;
            continue;
        }

        let search = prompt_search(console, &rules)?;
        console.pause(
            "\n\nHit Enter to push the zone changes to PAN config (or CTRL+C to exit the script)... ",
        )?;

        let mut rulebase = doc
            .rulebase_mut(&scope)
            .with_context(|| format!("failed to open the {scope}"))?;
        let report = apply_to_document(&search.matches, &search.replacement, &mut rulebase)
            .context("configuration no longer matches the scanned rules")?;
        info!(
            renamed = report.renamed,
            removed = report.removed,
            "offline edit applied"
        );
        console.say(format!(
            "\n\n\nCongrats, all zones have been replaced in the {} rulebase!",
            scope.category
        ))?;

        console.say("\n\nWriting config to file. Please hold....\n")?;
        let written = doc
            .save_edited(&cfg.offline.output_prefix)
            .context("failed to write the edited configuration")?;
        console.say("\n\nYour changes were successfully written to config")?;
        console.say(format!("\nThe config was saved as {}", written.display()))?;
        console.say("\n\n\nHave a great day!!\n\n")?;
        return Ok(());
    }
}

// ---------------------------------------------------------------------------
// Shared dialogue
// ---------------------------------------------------------------------------

fn announce_device<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    device: DeviceType,
) -> Result<()> {
    info!(%device, "device type detected");
    console.say(format!(
        "\n\n...Auto-detected device type to be {}...\n",
        match device {
            DeviceType::Firewall => "a firewall",
            DeviceType::Panorama => "Panorama",
        }
    ))
}

/// Device group (Panorama), rulebase category, then pre/post (Panorama).
fn select_scope<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    device: DeviceType,
    groups: &[String],
) -> Result<RulebaseScope> {
    let group = match device {
        DeviceType::Firewall => None,
        DeviceType::Panorama => {
            if groups.is_empty() {
                bail!("Panorama has no device groups");
            }
            let options: Vec<(String, String)> =
                groups.iter().map(|g| (g.clone(), g.clone())).collect();
            Some(console.choose(
                "\n\nHere's a list of device groups found in Panorama...\n",
                &options,
            )?)
        }
    };

    let categories: Vec<(String, RulebaseCategory)> = RulebaseCategory::ALL
        .iter()
        .map(|c| (c.label().to_string(), *c))
        .collect();
    let category = console.choose(
        "\n\nChoose the type of rulebase you would like to search...\n",
        &categories,
    )?;

    Ok(match group {
        None => RulebaseScope::firewall(category),
        Some(name) => {
            let positions: Vec<(String, RulebasePosition)> = RulebasePosition::ALL
                .iter()
                .map(|p| (p.label().to_string(), *p))
                .collect();
            let position = console.choose(
                "\n\nWould you like to search Pre or Post-rulebase?\n",
                &positions,
            )?;
            RulebaseScope::device_group(category, name, position)
        }
    })
}

/// Ask for a pattern and a replacement zone until at least one rule matches.
fn prompt_search<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    rules: &[RuleRecord],
) -> Result<Search> {
    loop {
        let source = console.ask("\n\nEnter your regex string for search and replace: ")?;
        let pattern = match ZonePattern::new(&source) {
            Ok(p) => p,
            Err(err) => {
                console.say(format!("\nThat is not a valid regex ({err}). Try again..."))?;
                continue;
            }
        };
        let replacement = console.ask(
            "\nEnter the new zone (The zone must exist on the firewall before pushing this change): ",
        )?;
        let replacement = replacement.trim().to_string();
        if replacement.is_empty() {
            console.say("\nThe new zone cannot be empty. Try again...")?;
            continue;
        }

        if pattern.matches_replacement(&replacement) {
            console.pause(
                "\n\nNote: Your regex string matches your new zone name. If there are any policies that \
                 currently contain your new zone,\ndon't worry, they'll be removed from the search query, \
                 so they won't be removed from policy. Hit Enter to continue... ",
            )?;
        }

        let matches = find_matches(rules, &pattern, &replacement);
        if matches.is_empty() {
            console.say(
                "\n\nThere were no policies with zones matching your regex string. Try a new string...",
            )?;
            continue;
        }

        show_matches(console, &matches)?;
        return Ok(Search {
            replacement,
            matches,
        });
    }
}

fn show_matches<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    matches: &MatchSet,
) -> Result<()> {
    let zones: Vec<&str> = matches.distinct_zones().into_iter().collect();
    console.say("\n\nThe following zones matched your search query:")?;
    console.say(zones.join(", "))?;

    let question = format!(
        "\n\nThere are {} matching policies. Would you like to see the policies? [Y/n]  ",
        matches.len()
    );
    if !console.confirm(&question)? {
        return Ok(());
    }
    for (rule, fields) in matches.iter() {
        console.say(format!("\nMatching policy: {rule}"))?;
        if !fields.to.is_empty() {
            console.say(format!("to zone match: {}", fields.to.join(", ")))?;
        }
        if !fields.from.is_empty() {
            console.say(format!("from zone match: {}", fields.from.join(", ")))?;
        }
    }
    Ok(())
}
