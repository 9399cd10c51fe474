use crate::config::ReportConfig;
use crate::dashboard::{thousands, DashboardView};
use crate::types::{GroupTotal, ALL_MUNICIPALITIES, ALL_ZONES};
use anyhow::Result;
use plotters::prelude::*;

const CHART_SIZE: (u32, u32) = (900, 420);
const BAR_COLOR: RGBColor = RGBColor(99, 110, 250);

const CSS: &str = "body{font-family:sans-serif;margin:0 2rem;background:#fafafa;color:#222}\
    form{display:flex;gap:2rem;margin:1rem 0}label{display:flex;flex-direction:column;gap:.3rem}\
    select{min-width:16rem;padding:.3rem}#map{height:800px;width:100%;max-width:1400px}\
    .note{color:#555}";

/// Renders the full dashboard page for one view.
pub fn render_page(report: &ReportConfig, view: &DashboardView) -> String {
    let mut page = String::with_capacity(64 * 1024);

    page.push_str("<!DOCTYPE html><html lang=\"pt-BR\"><head><meta charset=\"utf-8\">");
    page.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">");
    page.push_str(&format!("<title>{}</title>", esc(&report.title)));
    page.push_str("<link rel=\"stylesheet\" href=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.css\">");
    page.push_str(&format!("<style>{}</style></head><body>", CSS));

    page.push_str(&format!("<h1>{}</h1>", esc(&report.title)));
    page.push_str(&format!("<p class=\"note\">{}</p>", esc(&report.source_note)));
    page.push_str(&format!("<p><strong>{}</strong></p>", esc(&report.credits)));

    render_selectors(&mut page, view);

    page.push_str(&format!("<h3>Total de votos: <strong>{}</strong></h3>", thousands(view.total_votes)));

    page.push_str("<h3>Mapa de votos por seção eleitoral</h3><div id=\"map\"></div>");

    page.push_str("<h3>Municípios com mais votos</h3>");
    push_chart(
        &mut page,
        &format!("Top {} municipios com mais votos", report.top_n),
        "Municipio",
        &view.top_municipalities,
    );

    page.push_str("<h3>Zonas com mais votos</h3>");
    push_chart(
        &mut page,
        &format!("Top {} zonas com mais votos", report.top_n),
        "Zona",
        &view.top_zones,
    );

    page.push_str(&format!("<p>{}</p>", esc(&view.section_sentence)));
    page.push_str(&format!("<p>{}</p>", esc(&view.zone_sentence)));

    render_map_script(&mut page, view);

    page.push_str("</body></html>");
    page
}

fn render_selectors(page: &mut String, view: &DashboardView) {
    page.push_str("<form method=\"get\" action=\"/\" id=\"filters\">");

    // Changing municipality clears the zone so a stale one is never submitted
    page.push_str("<label>Selecione um Município:<select name=\"municipio\" \
        onchange=\"this.form.zona.value='';this.form.submit()\">");
    push_option(page, "", ALL_MUNICIPALITIES, view.municipality.is_none());
    for m in &view.municipality_options {
        push_option(page, m, m, view.municipality.as_deref() == Some(m.as_str()));
    }
    page.push_str("</select></label>");

    page.push_str("<label>Selecione uma Zona:<select name=\"zona\" onchange=\"this.form.submit()\">");
    push_option(page, "", ALL_ZONES, view.zone.is_none());
    for z in &view.zone_options {
        push_option(page, z, z, view.zone.as_deref() == Some(z.as_str()));
    }
    page.push_str("</select></label>");

    page.push_str("<noscript><button type=\"submit\">Filtrar</button></noscript></form>");
}

fn push_option(page: &mut String, value: &str, label: &str, selected: bool) {
    page.push_str(&format!(
        "<option value=\"{}\"{}>{}</option>",
        esc(value),
        if selected { " selected" } else { "" },
        esc(label)
    ));
}

fn push_chart(page: &mut String, title: &str, axis_label: &str, rows: &[GroupTotal]) {
    match bar_chart(title, axis_label, rows) {
        Ok(svg) => page.push_str(&svg),
        Err(e) => {
            tracing::warn!("Failed to draw chart {:?}: {:#}", title, e);
            page.push_str(&format!("<p>{}</p>", esc(title)));
        }
    }
}

fn render_map_script(page: &mut String, view: &DashboardView) {
    let points = serde_json::to_string(&view.points).unwrap_or_else(|_| "[]".to_string());

    page.push_str("<script src=\"https://unpkg.com/leaflet@1.9.4/dist/leaflet.js\"></script>");
    page.push_str("<script>");
    page.push_str(&format!("const points={};", script_safe(&points)));
    page.push_str(r#"
const map=L.map('map');
L.tileLayer('https://{s}.basemaps.cartocdn.com/dark_all/{z}/{x}/{y}{r}.png',{
  attribution:'&copy; OpenStreetMap contributors &copy; CARTO',subdomains:'abcd',maxZoom:19
}).addTo(map);
const maxVotes=points.reduce((m,p)=>Math.max(m,p.Votos),0)||1;
const esc=s=>String(s).replace(/[&<>"']/g,c=>({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}[c]));
const layer=L.featureGroup(points.map(p=>L.circleMarker([p.latitude,p.longitude],{
  radius:Math.max(2,25*Math.sqrt(p.Votos/maxVotes)),color:'green',fillColor:'green',
  opacity:0.5,fillOpacity:0.5,weight:1
}).bindPopup(
  'Zona: '+esc(p.Zona)+'<br>Seção: '+esc(p['Seção'])+'<br>Municipio: '+esc(p.Municipio)+
  '<br>Endereço: '+esc(p['Endereço'])+'<br>Votos: '+p.Votos
))).addTo(map);
if(points.length){map.fitBounds(layer.getBounds(),{maxZoom:14});}else{map.setView([-22.9,-43.2],10);}
"#);
    page.push_str("</script>");
}

/// Ranked vertical bar chart as an SVG document. An empty table yields bare axes.
pub fn bar_chart(title: &str, axis_label: &str, rows: &[GroupTotal]) -> Result<String> {
    let max = rows.iter().map(|r| r.votes).max().unwrap_or(0).max(1);
    let slots = rows.len().max(1);

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, CHART_SIZE).into_drawing_area();
        root.fill(&WHITE)?;

        let mut chart = ChartBuilder::on(&root)
            .caption(title, ("sans-serif", 18))
            .margin(12)
            .x_label_area_size(60)
            .y_label_area_size(70)
            .build_cartesian_2d((0..slots).into_segmented(), 0u64..max + max / 10 + 1)?;

        let key_label = |v: &SegmentValue<usize>| match v {
            SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
                rows.get(*i).map(|r| r.key.clone()).unwrap_or_default()
            }
            SegmentValue::Last => String::new(),
        };
        let votes_label = |v: &u64| thousands(*v);

        chart.configure_mesh()
            .disable_x_mesh()
            .x_labels(slots)
            .x_label_formatter(&key_label)
            .y_label_formatter(&votes_label)
            .x_desc(axis_label)
            .y_desc("Votos")
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(BAR_COLOR.filled())
                .margin(8)
                .data(rows.iter().enumerate().map(|(i, r)| (i, r.votes))),
        )?;

        root.present()?;
    }

    Ok(svg)
}

fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// JSON inside <script> must not open or close tags.
fn script_safe(json: &str) -> String {
    json.replace('<', "\\u003c")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Dataset;
    use crate::filter::tests::{record, scenario};
    use crate::types::Selection;

    fn page(dataset: &Dataset, municipality: Selection, zone: Selection) -> String {
        let report = ReportConfig::default();
        let view = DashboardView::build(dataset, &report, municipality, zone);
        render_page(&report, &view)
    }

    #[test]
    fn page_carries_every_block() {
        let html = page(&scenario(), Selection::All, Selection::All);
        assert!(html.contains("<h1>Votos de Wesley Teixeira por seção eleitoral em 2022</h1>"));
        assert!(html.contains("Total de votos: <strong>22</strong>"));
        assert!(html.contains("Top 10 municipios com mais votos"));
        assert!(html.contains("Top 10 zonas com mais votos"));
        assert!(html.contains("Zona 1"));
        assert!(html.contains("de 952 no Estado."));
        assert!(html.contains("de 165 no Estado."));
    }

    #[test]
    fn current_selection_is_marked() {
        let html = page(&scenario(), Selection::Only("A".into()), Selection::Only("2".into()));
        assert!(html.contains("<option value=\"A\" selected>A</option>"));
        assert!(html.contains("<option value=\"2\" selected>2</option>"));
        assert!(html.contains("<option value=\"\">Todos</option>"));
    }

    #[test]
    fn dataset_text_is_escaped() {
        let dataset = Dataset::new(vec![record("<script>alert(1)</script>", "1", "1", 3)]);
        let html = page(&dataset, Selection::All, Selection::All);
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
    }

    #[test]
    fn empty_chart_still_draws() {
        let svg = bar_chart("Vazio", "Zona", &[]).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("Vazio"));
    }

    #[test]
    fn one_bar_per_row() {
        let rows = vec![
            GroupTotal { key: "Alfa".into(), votes: 10 },
            GroupTotal { key: "Beta".into(), votes: 5 },
        ];
        let empty = bar_chart("t", "Municipio", &[]).unwrap();
        let svg = bar_chart("t", "Municipio", &rows).unwrap();

        assert_eq!(svg.matches("<rect").count(), empty.matches("<rect").count() + 2);
        assert!(svg.contains("Alfa"));
        assert!(svg.contains("Beta"));
    }
}
