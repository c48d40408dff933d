//! Page-side snippets evaluated inside WhatsApp Web.
//!
//! Deliberately shallow: selector checks and a small send helper. The
//! protocol itself belongs to the platform, not to this crate.

/// Entry point the driven browser keeps loaded.
pub const WHATSAPP_URL: &str = "https://web.whatsapp.com/";

/// Single probe evaluated on every poll tick. Returns
/// `{ready, qr, authError, number}` so one round-trip covers every
/// lifecycle signal.
pub const STATE_PROBE: &str = r#"
(() => {
	const qr = document.querySelector('div[data-ref]')?.getAttribute('data-ref') ?? null;
	const ready = !!document.querySelector(
		'#pane-side, [data-testid="chat-list"], [aria-label="Chat list"]'
	);
	const authError = !!document.querySelector(
		'[data-testid="unable-to-connect"], [data-testid="sign-out-confirm"]'
	);
	let number = null;
	try {
		const raw = localStorage.getItem('last-wid-md') || localStorage.getItem('last-wid');
		if (raw) {
			number = raw.replace(/"/g, '').split(':')[0].split('@')[0];
		}
	} catch (e) {
		number = null;
	}
	return { ready, qr, authError, number };
})()
"#;

/// Installs `window.__wagateSend(to, body)` once the app is ready, by
/// raiding the page's module registry for the chat and send primitives.
/// Returns `false` when the internals cannot be resolved.
pub const INSTALL_SEND_HELPER: &str = r#"
(() => {
	if (window.__wagateSend) return true;
	const mods = {};
	const chunk = window.webpackChunkwhatsapp_web_client;
	if (chunk) {
		chunk.push([['wagate'], {}, (req) => {
			for (const key of Object.keys(req.m)) {
				try { mods[key] = req(key); } catch (e) {}
			}
		}]);
	}
	const find = (pred) => {
		for (const key of Object.keys(mods)) {
			const mod = mods[key];
			if (mod && pred(mod)) return mod;
			if (mod && mod.default && pred(mod.default)) return mod.default;
		}
		return null;
	};
	const chats = find((m) => m.Chat && m.Msg)?.Chat
		?? find((m) => m.ChatCollection)?.ChatCollection;
	const widFactory = find((m) => m.createWid)?.createWid;
	const send = find((m) => m.sendTextMsgToChat)?.sendTextMsgToChat
		?? find((m) => m.addAndSendTextMsg)?.addAndSendTextMsg;
	if (!chats || !widFactory || !send) return false;
	window.__wagateSend = async (to, body) => {
		const chat = await chats.find(widFactory(to));
		if (!chat) return false;
		await send(chat, body);
		return true;
	};
	return true;
})()
"#;

/// Expression dispatching one message through the installed helper.
pub fn send_expression(recipient: &str, body: &str) -> String {
	let to = serde_json::Value::String(recipient.to_string());
	let text = serde_json::Value::String(body.to_string());
	format!("window.__wagateSend ? window.__wagateSend({to}, {text}) : false")
}
