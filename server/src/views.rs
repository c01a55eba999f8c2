//! HTML rendering for the panel. One dark-themed page, inline CSS/JS,
//! no template engine.

use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

use lemonade_manager_core::{Config, Error, Health, ModelEntry, ModelOptions};

/// Escape a value for interpolation into HTML text or attributes.
pub fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// Full-page view when the upstream server cannot be reached.
pub fn connection_error(base_url: &str, err: &Error) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><body style="font-family:sans-serif; background:#0b0b0e; color:#e5e7eb; padding:2rem;">
<h1>Connection Error</h1>
<p>Could not connect to Lemonade Server at <code>{base}</code></p>
<p><strong>Note:</strong> If the server requires an API Key, ensure <code>LEMONADE_KEY</code> is set.</p>
<pre>{err}</pre>
<p><a href="/" style="color:#60a5fa;">Retry</a></p>
</body></html>
"#,
        base = escape(base_url),
        err = escape(&err.to_string()),
    )
}

/// Small page for a failed action; the operator retries manually.
pub fn error_page(err: &Error) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><body style="font-family:sans-serif; background:#0b0b0e; color:#e5e7eb; padding:2rem;">
<h1>Action Failed</h1>
<pre>{err}</pre>
<p><a href="/" style="color:#60a5fa;">Back to manager</a></p>
</body></html>
"#,
        err = escape(&err.to_string()),
    )
}

/// The main panel.
pub fn index(
    config: &Config,
    models: &[ModelEntry],
    health: &Health,
    stats: Option<&Value>,
    saved: &BTreeMap<String, ModelOptions>,
    disabled: &BTreeSet<String>,
) -> String {
    let loaded_ids = health.loaded_ids();

    let rows: String = models
        .iter()
        .map(|model| {
            let stored = saved.get(&model.id).cloned().unwrap_or_default();
            let is_loaded = loaded_ids.contains(model.id.as_str());
            let is_disabled = disabled.contains(&model.id);
            model_row(model, &stored, is_loaded, is_disabled)
        })
        .collect();

    let stats_html = match stats {
        Some(stats) => {
            let pretty = serde_json::to_string_pretty(stats).unwrap_or_else(|_| stats.to_string());
            format!(
                r#"<div class="stats-container">
    <h2>Last Request Stats</h2>
    <pre>{}</pre>
</div>"#,
                escape(&pretty)
            )
        }
        None => String::new(),
    };

    let loaded_model_name = health.model_loaded.as_deref().unwrap_or("None");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Lemonade Manager</title>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <style>{style}</style>
  <script>{script}</script>
</head>
<body>

  <div id="loading-overlay">
    <div class="spinner"></div>
    <div>Processing... please wait</div>
  </div>

  <div id="delete-modal" class="modal">
    <div class="modal-content">
        <div class="modal-title" style="color:#ef4444">Delete Model?</div>
        <p>Are you sure you want to delete <strong><span id="delete-target-name"></span></strong>?</p>
        <p>This will remove the files from disk. <span style="color:#ef4444; font-weight:bold;">This action is irreversible.</span></p>
        <div class="modal-actions">
            <button onclick="closeDeleteModal()" class="btn-secondary">Cancel</button>
            <button onclick="confirmDelete()" class="btn-red">Yes, Delete</button>
        </div>
    </div>
  </div>

  <div id="pull-modal" class="modal">
    <div class="modal-content">
        <div class="modal-title">Confirm Download</div>
        <div id="pull-status-msg">
            <p>You are about to pull the following model:</p>
            <ul>
                <li><strong>Name:</strong> <span id="conf_m_name"></span></li>
                <li><strong>Checkpoint:</strong> <span id="conf_m_check"></span></li>
                <li><strong>Recipe:</strong> <span id="conf_m_recipe"></span></li>
            </ul>
            <p class="text-sm text-muted">Timeout set to: {pull_timeout}s. Large models may take a long time.</p>
        </div>

        <div id="pull-progress"></div>

        <div class="modal-actions" id="pull-actions">
            <button onclick="closePullModal()" class="btn-secondary">Cancel</button>
            <button onclick="executePull()" class="btn-primary">Yes, Pull Model</button>
        </div>
    </div>
  </div>

  <div class="toolbar">
    <h1>Lemonade Manager</h1>
    <div>
       Running Model: <code>{loaded}</code>
    </div>
    <form method="post" action="/unload" onsubmit="showLoading()">
      <button type="submit" class="btn-red">Unload ALL Models</button>
    </form>
  </div>

  <div style="overflow-x: auto;">
  <table>
    <thead>
      <tr>
        <th style="width: 20%;">Model ID</th>
        <th style="width: 15%;">Recipe / Backend</th>
        <th style="width: 5%; text-align:center;">DL</th>
        <th style="width: 10%;">Status</th>
        <th style="width: 50%;">Actions &amp; Defaults</th>
      </tr>
    </thead>
    <tbody>
      {rows}
    </tbody>
  </table>
  </div>

  <div class="section-container">
    <h2>Pull New Model</h2>
    <form id="pull-form" onsubmit="showPullConfirm(event)">
        <div style="display:grid; grid-template-columns: 1fr 1fr; gap: 1rem;">

            <div class="form-group">
                <label class="form-label">Model Name (Namespace required)</label>
                <input type="text" id="pull_model_name" name="model_name" class="form-control" value="user." required>
            </div>

            <div class="form-group">
                <label class="form-label">Checkpoint (HuggingFace ID)</label>
                <input type="text" id="pull_checkpoint" name="checkpoint" class="form-control" placeholder="e.g. unsloth/Phi-4-mini-instruct-GGUF:Q4_K_M" required>
            </div>

            <div class="form-group">
                <label class="form-label">Recipe</label>
                <input type="text" id="pull_recipe" name="recipe" class="form-control" placeholder="e.g. llamacpp" required>
            </div>

            <div class="form-group">
                <label class="form-label">Multimodal Projector (Optional)</label>
                <div class="checkbox-wrapper">
                    <input type="checkbox" id="mmproj_enabled" onchange="toggleMmproj()">
                    <input type="text" id="mmproj_input" name="mmproj" class="form-control" placeholder="mmproj file path" disabled>
                </div>
            </div>
        </div>
        <div style="margin-top: 1rem;">
            <button type="submit" class="btn-primary">Pull Model</button>
        </div>
    </form>
  </div>

  <p class="text-muted text-sm" style="margin-top:1rem;">
    Defaults file: <code>{recipe_file}</code>
  </p>

  {stats}
</body>
</html>
"#,
        style = STYLE,
        script = SCRIPT,
        pull_timeout = config.timeouts.pull.as_secs(),
        loaded = escape(loaded_model_name),
        rows = rows,
        recipe_file = escape(&config.storage.recipe_file.display().to_string()),
        stats = stats_html,
    )
}

/// One table row for a model.
fn model_row(model: &ModelEntry, stored: &ModelOptions, is_loaded: bool, is_disabled: bool) -> String {
    let mid = escape(&model.id);
    let row_class = if is_disabled { "disabled-row" } else { "" };
    let form_id = format!("form-{}", mid);

    let delete_btn = format!(
        r#"<button type="button" class="btn-xs btn-outline btn-trash"
            onclick="showDeleteConfirm('{mid}')" title="Delete Model">Delete</button>"#,
    );

    let toggle = if is_disabled {
        format!(
            r#"<form method="post" action="/disable" class="inline-form">
                  <input type="hidden" name="model_name" value="{mid}">
                  <input type="hidden" name="disabled" value="0">
                  <button type="submit" class="btn-xs">Enable</button>
                </form>"#,
        )
    } else {
        format!(
            r#"<form method="post" action="/disable" class="inline-form">
                  <input type="hidden" name="model_name" value="{mid}">
                  <input type="hidden" name="disabled" value="1">
                  <button type="submit" class="btn-xs btn-outline">Disable</button>
                </form>"#,
        )
    };

    let id_html = format!(
        r#"<div class="model-id">{mid}</div>
            <div class="btn-group">
                {toggle}
                {delete_btn}
            </div>"#,
    );

    let recipe_html = if model.uses_llamacpp() && !is_disabled {
        format!(
            r#"<div class="recipe-text">{recipe}</div>
            <div class="backend-wrapper">
               <input form="{form_id}" type="text" name="llamacpp_backend"
                      placeholder="backend (e.g. vulkan)"
                      class="input-backend"
                      value="{backend}">
            </div>"#,
            recipe = escape(&model.recipe),
            backend = escape(stored.llamacpp_backend.as_deref().unwrap_or("")),
        )
    } else {
        format!(r#"<div class="recipe-text">{}</div>"#, escape(&model.recipe))
    };

    let status_html = if is_loaded {
        format!(
            r#"<div class="status-badge loaded">Running</div>
            <form method="post" action="/unload/model" class="mt-1" onsubmit="showLoading()">
              <input type="hidden" name="model_name" value="{mid}">
              <button type="submit" class="btn-xs btn-red">Unload</button>
            </form>"#,
        )
    } else {
        r#"<div class="status-badge">Stopped</div>"#.to_string()
    };

    let actions_html = if is_disabled {
        r#"<div class="text-muted text-sm">
              <em>Model is hidden. Enable to configure.</em>
            </div>"#
            .to_string()
    } else {
        let ctx_value = stored
            .ctx_size
            .map(|value| value.to_string())
            .unwrap_or_default();
        let args_value = escape(stored.llamacpp_args.as_deref().unwrap_or(""));
        let ctx_hint = if ctx_value.is_empty() { "default" } else { ctx_value.as_str() };
        let args_hint = if args_value.is_empty() { "none" } else { args_value.as_str() };

        format!(
            r#"<form id="{form_id}" method="post" class="action-form" onsubmit="showLoading()">
                <input type="hidden" name="model_name" value="{mid}">

                <div class="action-row">
                  <button type="submit" formaction="/defaults/load" class="btn-primary" title="Load using parameters from recipe_options.json">
                    Load (Default)
                  </button>
                  <div class="info-text">
                    Saved: <strong>{ctx_hint}</strong> ctx,
                    <strong>{args_hint}</strong> args
                  </div>
                </div>

                <div class="action-row mt-1">
                  <input type="number" name="ctx_size" placeholder="ctx size" min="1024" step="1024" class="input-ctx" value="{ctx_value}">
                  <input type="text" name="llamacpp_args" placeholder="args (e.g. -np 4)" class="input-args" value="{args_value}">

                  <div class="btn-group">
                    <button type="submit" formaction="/load" class="btn-secondary">Load Custom</button>
                    <button type="submit" formaction="/defaults/set" class="btn-save" title="Save these settings to recipe_options.json">Save</button>
                  </div>
                </div>
            </form>"#,
        )
    };

    let downloaded_mark = if model.downloaded { "&#10003;" } else { "&#10007;" };

    format!(
        r#"<tr class="{row_class}">
          <td>{id_html}</td>
          <td>{recipe_html}</td>
          <td class="center-text">{downloaded_mark}</td>
          <td>{status_html}</td>
          <td>{actions_html}</td>
        </tr>
"#,
    )
}

const STYLE: &str = r#"
    :root {
        --bg-body: #0b0b0e;
        --bg-panel: #111827;
        --border: #374151;
        --text-main: #e5e7eb;
        --text-muted: #9ca3af;
        --primary: #2563eb;
        --primary-hover: #1d4ed8;
        --danger: #7f1d1d;
        --success: #065f46;
    }
    * { box-sizing: border-box; }
    body { font-family: system-ui, -apple-system, sans-serif; background: var(--bg-body); color: var(--text-main); margin: 0; padding: 1.5rem; }

    /* Layout */
    .toolbar { display: flex; justify-content: space-between; align-items: center; background: var(--bg-panel); padding: 1rem; border-radius: 8px; border: 1px solid var(--border); margin-bottom: 1.5rem; flex-wrap: wrap; gap: 1rem; }
    .section-container { margin-top: 2rem; background: var(--bg-panel); padding: 1.5rem; border-radius: 8px; border: 1px solid var(--border); }
    .stats-container { margin-top: 2rem; background: var(--bg-panel); padding: 1rem; border-radius: 8px; border: 1px solid var(--border); }

    /* Tables */
    table { width: 100%; border-collapse: separate; border-spacing: 0; border: 1px solid var(--border); border-radius: 8px; overflow: hidden; }
    th, td { padding: 0.75rem 1rem; border-bottom: 1px solid var(--border); vertical-align: top; }
    th { background: #1f2937; text-align: left; font-weight: 600; font-size: 0.85rem; text-transform: uppercase; letter-spacing: 0.05em; }
    tr:last-child td { border-bottom: none; }
    tr:nth-child(even) { background: #131b2e; }
    .disabled-row { opacity: 0.5; background: #0f1115 !important; }
    .center-text { text-align: center; }

    /* Typography */
    h1 { margin: 0; font-size: 1.5rem; display: flex; align-items: center; gap: 0.5rem; }
    h2 { margin-top: 0; font-size: 1.25rem; color: var(--primary); }
    code { font-family: 'Menlo', 'Monaco', monospace; background: #1f2937; padding: 0.2rem 0.4rem; border-radius: 4px; color: #60a5fa; font-size: 0.9em; }
    .text-muted { color: var(--text-muted); }
    .text-sm { font-size: 0.8rem; }
    .model-id { font-family: monospace; font-weight: bold; margin-bottom: 0.5rem; word-break: break-all; }

    /* Forms & Inputs */
    input { background: #1f2937; border: 1px solid #4b5563; color: var(--text-main); border-radius: 4px; padding: 0.35rem 0.5rem; font-size: 0.85rem; }
    input:focus { outline: 2px solid var(--primary); border-color: transparent; }
    input:disabled { opacity: 0.5; cursor: not-allowed; }
    .input-ctx { width: 6rem; }
    .input-args { width: 12rem; }
    .input-backend { width: 100%; margin-top: 0.25rem; }
    .form-group { margin-bottom: 0.75rem; }
    .form-label { display: block; font-size: 0.85rem; color: var(--text-muted); margin-bottom: 0.25rem; }
    .form-control { width: 100%; }
    .checkbox-wrapper { display: flex; align-items: center; gap: 0.5rem; }

    /* Buttons */
    button { cursor: pointer; border: none; border-radius: 4px; padding: 0.35rem 0.75rem; font-size: 0.85rem; font-weight: 500; transition: all 0.15s; color: white; }
    .btn-primary { background: var(--primary); }
    .btn-primary:hover { background: var(--primary-hover); }
    .btn-secondary { background: #4b5563; }
    .btn-secondary:hover { background: #6b7280; }
    .btn-save { background: #059669; }
    .btn-save:hover { background: #047857; }
    .btn-red { background: #991b1b; }
    .btn-red:hover { background: #b91c1c; }
    .btn-outline { background: transparent; border: 1px solid #4b5563; }
    .btn-outline:hover { background: #374151; }
    .btn-xs { padding: 0.2rem 0.5rem; font-size: 0.75rem; }
    .btn-trash { color: #ef4444; border-color: #7f1d1d; }
    .btn-trash:hover { background: #7f1d1d; color: white; }

    /* Flex Utilities */
    .mt-1 { margin-top: 0.5rem; }
    .action-row { display: flex; align-items: center; gap: 0.75rem; flex-wrap: wrap; }
    .btn-group { display: flex; gap: 0.25rem; }
    .info-text { font-size: 0.75rem; color: var(--text-muted); }
    .status-badge { display: inline-block; padding: 0.2rem 0.6rem; border-radius: 99px; font-size: 0.75rem; font-weight: bold; background: #374151; color: #9ca3af; }
    .status-badge.loaded { background: #064e3b; color: #6ee7b7; border: 1px solid #059669; }

    /* Modal / Dialog */
    .modal { display: none; position: fixed; top: 0; left: 0; width: 100%; height: 100%; background: rgba(0,0,0,0.7); z-index: 9000; align-items: center; justify-content: center; }
    .modal-content { background: var(--bg-panel); padding: 1.5rem; border-radius: 8px; border: 1px solid var(--border); width: 90%; max-width: 500px; box-shadow: 0 4px 6px rgba(0,0,0,0.3); }
    .modal-actions { display: flex; justify-content: flex-end; gap: 0.5rem; margin-top: 1.5rem; }
    .modal-title { font-size: 1.25rem; font-weight: bold; margin-bottom: 1rem; color: #f3f4f6; }

    /* Loading Overlay */
    #loading-overlay {
        display: none; position: fixed; top: 0; left: 0; width: 100%; height: 100%;
        background: rgba(0,0,0,0.8); z-index: 9999;
        align-items: center; justify-content: center; flex-direction: column;
    }
    .spinner {
        width: 40px; height: 40px; border: 4px solid #374151; border-top: 4px solid #3b82f6; border-radius: 50%;
        animation: spin 1s linear infinite; margin-bottom: 1rem;
    }
    @keyframes spin { 0% { transform: rotate(0deg); } 100% { transform: rotate(360deg); } }

    /* Progress Log */
    #pull-progress {
        margin-top: 1rem; background: #000; padding: 1rem; border-radius: 4px;
        font-family: monospace; font-size: 0.8rem; height: 150px; overflow-y: auto;
        border: 1px solid var(--border); display: none;
    }
    .progress-line { margin-bottom: 0.25rem; border-bottom: 1px solid #333; padding-bottom: 0.25rem; }
"#;

const SCRIPT: &str = r#"
    function showLoading() {
        document.getElementById('loading-overlay').style.display = 'flex';
    }

    // --- Delete Feature Scripts ---
    let deleteModelTarget = "";

    function showDeleteConfirm(modelName) {
        deleteModelTarget = modelName;
        document.getElementById('delete-target-name').innerText = modelName;
        document.getElementById('delete-modal').style.display = 'flex';
    }

    function closeDeleteModal() {
        document.getElementById('delete-modal').style.display = 'none';
        deleteModelTarget = "";
    }

    function confirmDelete() {
        if(!deleteModelTarget) return;
        const form = document.createElement('form');
        form.method = 'POST';
        form.action = '/delete_model';
        const input = document.createElement('input');
        input.type = 'hidden';
        input.name = 'model_name';
        input.value = deleteModelTarget;
        form.appendChild(input);
        document.body.appendChild(form);
        showLoading();
        form.submit();
    }

    // --- Pull Feature Scripts ---
    function toggleMmproj() {
        const chk = document.getElementById('mmproj_enabled');
        const txt = document.getElementById('mmproj_input');
        txt.disabled = !chk.checked;
        if (!chk.checked) txt.value = "";
    }

    function showPullConfirm(e) {
        e.preventDefault();
        // Gather values for display
        const mName = document.getElementById('pull_model_name').value;
        const mCheck = document.getElementById('pull_checkpoint').value;
        const mRecipe = document.getElementById('pull_recipe').value;

        document.getElementById('conf_m_name').innerText = mName;
        document.getElementById('conf_m_check').innerText = mCheck;
        document.getElementById('conf_m_recipe').innerText = mRecipe;

        document.getElementById('pull-modal').style.display = 'flex';
    }

    function closePullModal() {
        document.getElementById('pull-modal').style.display = 'none';
    }

    async function executePull() {
        // Switch view to progress
        document.getElementById('pull-actions').style.display = 'none';
        document.getElementById('pull-status-msg').innerText = "Initializing download... DO NOT CLOSE THIS WINDOW.";
        const logBox = document.getElementById('pull-progress');
        logBox.style.display = 'block';
        logBox.innerHTML = "<div>Starting stream...</div>";

        // Prepare form data as application/x-www-form-urlencoded
        const formData = new FormData(document.getElementById('pull-form'));
        const body = new URLSearchParams(formData);

        try {
            const response = await fetch('/pull/stream', {
                method: 'POST',
                headers: { 'Content-Type': 'application/x-www-form-urlencoded' },
                body: body
            });

            const reader = response.body.getReader();
            const decoder = new TextDecoder();

            while (true) {
                const { done, value } = await reader.read();
                if (done) break;

                const chunk = decoder.decode(value);
                // SSE format sends "data: ... \n\n"; simple parsing for display
                const lines = chunk.split('\n');
                let bufferHtml = "";

                lines.forEach(line => {
                    if(line.startsWith('data: ')) {
                        try {
                            const jsonData = JSON.parse(line.substring(6));
                            if (jsonData.percent) {
                                bufferHtml += `<div class="progress-line">Progress: ${jsonData.percent}% - File index: ${jsonData.file_index || '?'}</div>`;
                            } else if (jsonData.error) {
                                bufferHtml += `<div style="color:red">Error: ${jsonData.error}</div>`;
                            } else {
                                bufferHtml += `<div>${JSON.stringify(jsonData)}</div>`;
                            }
                        } catch (e) {
                           // ignore incomplete json chunks
                        }
                    }
                });

                if (bufferHtml) {
                    logBox.innerHTML += bufferHtml;
                    logBox.scrollTop = logBox.scrollHeight;
                }
            }

            // Done
            logBox.innerHTML += "<div style='color:#6ee7b7; font-weight:bold; margin-top:10px;'>Process Complete. Reloading...</div>";
            setTimeout(() => window.location.reload(), 2000);

        } catch (err) {
            logBox.innerHTML += `<div style="color:red">Network Error: ${err}</div>`;
            document.getElementById('pull-actions').style.display = 'flex';
        }
    }
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_covers_markup_and_quotes() {
        assert_eq!(
            escape(r#"<b a="1">&'"#),
            "&lt;b a=&quot;1&quot;&gt;&amp;&#39;"
        );
    }

    #[test]
    fn row_hides_actions_for_disabled_models() {
        let model = ModelEntry {
            id: "user.qwen".to_string(),
            recipe: "llamacpp".to_string(),
            downloaded: true,
        };
        let row = model_row(&model, &ModelOptions::default(), false, true);
        assert!(row.contains("disabled-row"));
        assert!(row.contains("Enable"));
        assert!(row.contains("Model is hidden"));
        assert!(!row.contains("Load (Default)"));
        // Hidden rows do not expose the backend override input either
        assert!(!row.contains("input-backend"));
    }

    #[test]
    fn row_offers_backend_input_only_for_llamacpp() {
        let stored = ModelOptions {
            ctx_size: Some(4096),
            llamacpp_args: Some("-np 4".to_string()),
            llamacpp_backend: Some("vulkan".to_string()),
        };
        let llamacpp = ModelEntry {
            id: "user.phi".to_string(),
            recipe: "llamacpp".to_string(),
            downloaded: true,
        };
        let row = model_row(&llamacpp, &stored, true, false);
        assert!(row.contains("input-backend"));
        assert!(row.contains(r#"value="vulkan""#));
        assert!(row.contains("Running"));
        assert!(row.contains("4096"));

        let other = ModelEntry {
            id: "user.other".to_string(),
            recipe: "oga-hybrid".to_string(),
            downloaded: false,
        };
        let row = model_row(&other, &ModelOptions::default(), false, false);
        assert!(!row.contains("input-backend"));
        assert!(row.contains("Stopped"));
    }

    #[test]
    fn model_ids_are_escaped_into_markup() {
        let model = ModelEntry {
            id: "user.<script>".to_string(),
            recipe: String::new(),
            downloaded: true,
        };
        let row = model_row(&model, &ModelOptions::default(), false, false);
        assert!(!row.contains("<script>"));
        assert!(row.contains("&lt;script&gt;"));
    }
}
