use std::collections::HashSet;
use url::Url;

const HIGH_KEYWORDS: &[&str] = &[
	"quem-somos", "sobre", "institucional", "portfolio", "produto", "servico", "solucoes", "atuacao", "tecnologia", "clientes",
	"cases", "projetos", "obras", "certificacoes", "premios", "parceiros", "equipe", "time", "lideranca", "contato",
	"fale-conosco", "unidades",
];

const LOW_KEYWORDS: &[&str] = &["login", "signin", "cart", "policy", "blog", "news", "politica-privacidade", "termos"];

/// Scores same-domain `links` by identity/offerings/trust keyword heuristics with a
/// depth penalty, and returns the top `limit` above a score floor, per spec.md §4.E.
pub fn prioritize_links(links: &HashSet<String>, base_url: &str, limit: usize) -> Vec<String> {
	let base_trimmed = base_url.trim_end_matches('/');
	let mut scored: Vec<(i64, String)> = links
		.iter()
		.filter(|l| l.trim_end_matches('/') != base_trimmed)
		.map(|l| (score(l), l.clone()))
		.filter(|(s, _)| *s > -50)
		.collect();

	scored.sort_by_key(|(score, _)| std::cmp::Reverse(*score));
	scored.into_iter().take(limit).map(|(_, l)| l).collect()
}

fn score(link: &str) -> i64 {
	let lower = link.to_lowercase();
	let mut s = 0i64;
	if LOW_KEYWORDS.iter().any(|k| lower.contains(k)) {
		s -= 100;
	}
	if HIGH_KEYWORDS.iter().any(|k| lower.contains(k)) {
		s += 50;
	}
	let depth = Url::parse(link).map(|u| u.path().split('/').filter(|s| !s.is_empty()).count()).unwrap_or(0);
	s -= depth as i64;
	s
}
