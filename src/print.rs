//! Console tables for Zernike indices, SLM settings, pattern summaries and camera properties.

use stanza::style::{HAlign, Header, MinWidth, Separator, Styles};
use stanza::table::{Col, Row, Table};

use crate::camera::alliedvision::Property;
use crate::display::DisplayShape;
use crate::linear::Matrix;
use crate::slm::SlmSettings;
use crate::zernike::Polar;

pub fn tabulate_zernike(indices: &[Polar]) -> Table {
    let mut table = Table::default()
        .with_cols({
            let mut cols = vec![];
            for _ in 0..4 {
                cols.push(Col::new(
                    Styles::default().with(MinWidth(6)).with(HAlign::Right),
                ));
            }
            cols.push(Col::new(
                Styles::default()
                    .with(Separator(true))
                    .with(MinWidth(9))
                    .with(HAlign::Centred),
            ));
            cols.push(Col::new(
                Styles::default().with(MinWidth(9)).with(HAlign::Centred),
            ));
            cols.push(Col::new(
                Styles::default()
                    .with(Separator(true))
                    .with(MinWidth(30))
                    .with(HAlign::Left),
            ));
            cols
        })
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "ANSI".into(),
                "Noll".into(),
                "Fringe".into(),
                "Wyant".into(),
                "(n, l)".into(),
                "(n, m)".into(),
                "Name".into(),
            ],
        ));

    for polar in indices {
        let (n, m) = polar.cartesian();
        table.push_row(Row::new(
            Styles::default(),
            vec![
                polar.ansi().to_string().into(),
                polar.noll().to_string().into(),
                polar.fringe().to_string().into(),
                polar.wyant().to_string().into(),
                format!("({}, {})", polar.n(), polar.l()).into(),
                format!("({n}, {m})").into(),
                polar.name().unwrap_or("").into(),
            ],
        ));
    }
    table
}

pub fn tabulate_settings(settings: &SlmSettings) -> Table {
    tabulate_pairs(&[
        ("Name", settings.name.clone()),
        ("Shape", DisplayShape(settings.shape()).to_string()),
        ("Bitdepth", settings.bitdepth.to_string()),
        ("Wavelength (µm)", format!("{:.4}", settings.wav_um)),
        ("Design wavelength (µm)", format!("{:.4}", settings.wav_design_um())),
        (
            "Pitch (µm)",
            format!("{:.2} x {:.2}", settings.pitch_um.0, settings.pitch_um.1),
        ),
        ("Phase scaling", format!("{:.4}", settings.phase_scaling())),
    ])
}

/// Ranges of a rendered phase and of the gray levels it quantized to.
pub fn tabulate_pattern(phase: &Matrix<f64>, display: &Matrix<u16>) -> Table {
    let gray_min = display.iter().copied().min().unwrap_or(0);
    let gray_max = display.iter().copied().max().unwrap_or(0);
    let gray_mean = if display.is_empty() {
        0.0
    } else {
        display.iter().map(|&level| level as f64).sum::<f64>() / display.len() as f64
    };
    Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(10)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec!["".into(), "Min".into(), "Max".into(), "Mean".into()],
        ))
        .with_row(Row::new(
            Styles::default(),
            vec![
                "Phase".into(),
                format!("{:.6}", phase.nan_min()).into(),
                format!("{:.6}", phase.nan_max()).into(),
                format!("{:.6}", phase.mean()).into(),
            ],
        ))
        .with_row(Row::new(
            Styles::default(),
            vec![
                "Gray".into(),
                gray_min.to_string().into(),
                gray_max.to_string().into(),
                format!("{gray_mean:.3}").into(),
            ],
        ))
}

pub fn tabulate_properties(properties: &[Property]) -> Table {
    let mut table = Table::default()
        .with_cols(vec![
            Col::new(Styles::default().with(MinWidth(20)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(12)).with(HAlign::Right)),
            Col::new(Styles::default().with(MinWidth(5)).with(HAlign::Left)),
            Col::new(Styles::default().with(MinWidth(30)).with(HAlign::Left)),
        ])
        .with_row(Row::new(
            Styles::default().with(Header(true)),
            vec![
                "Feature".into(),
                "Value".into(),
                "Unit".into(),
                "Description".into(),
            ],
        ));
    for property in properties {
        table.push_row(Row::new(
            Styles::default(),
            vec![
                property.name.clone().into(),
                property
                    .value
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default()
                    .into(),
                property.unit.clone().unwrap_or_default().into(),
                property.description.clone().unwrap_or_default().into(),
            ],
        ));
    }
    table
}

fn tabulate_pairs(pairs: &[(&str, String)]) -> Table {
    let mut table = Table::default().with_cols(vec![
        Col::new(Styles::default().with(MinWidth(24)).with(HAlign::Left)),
        Col::new(Styles::default().with(MinWidth(16)).with(HAlign::Right)),
    ]);
    for (key, value) in pairs {
        table.push_row(Row::new(
            Styles::default(),
            vec![(*key).into(), value.clone().into()],
        ));
    }
    table
}

#[cfg(test)]
mod tests {
    use stanza::renderer::console::Console;
    use stanza::renderer::Renderer;

    use super::*;
    use crate::camera::alliedvision::FeatureValue;

    fn render(table: &Table) -> String {
        Console::default().render(table).to_string()
    }

    #[test]
    fn zernike_table() {
        let indices: Vec<_> = (0..6).map(|j| Polar::from_ansi(j).unwrap()).collect();
        let rendered = render(&tabulate_zernike(&indices));
        assert!(rendered.contains("Vertical astigmatism"));
        assert!(rendered.contains("(2, 2)"));
        assert!(rendered.contains("Fringe"));
    }

    #[test]
    fn settings_table() {
        let settings = SlmSettings {
            name: "HSP1920".into(),
            width: 1920,
            height: 1152,
            bitdepth: 8,
            wav_um: 0.532,
            wav_design_um: Some(1.064),
            pitch_um: (9.2, 9.2),
        };
        let rendered = render(&tabulate_settings(&settings));
        assert!(rendered.contains("1920x1152"));
        assert!(rendered.contains("0.5000"));
    }

    #[test]
    fn pattern_table() {
        let phase = Matrix::from_vec(1, 2, vec![0.0, 1.0]);
        let display = Matrix::from_vec(1, 2, vec![0u16, 40]);
        let rendered = render(&tabulate_pattern(&phase, &display));
        assert!(rendered.contains("1.000000"));
        assert!(rendered.contains("20.000"));
    }

    #[test]
    fn properties_table() {
        let properties = vec![Property {
            name: "ExposureTime".into(),
            value: Some(FeatureValue::Float(2500.0)),
            unit: Some("us".into()),
            description: None,
        }];
        let rendered = render(&tabulate_properties(&properties));
        assert!(rendered.contains("ExposureTime"));
        assert!(rendered.contains("2500"));
    }
}
