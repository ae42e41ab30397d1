//! Generate an insights report for manual inspection

fn main() {
    let json = r#"{
        "anthropometrics": { "height_cm": 168, "weight_kg": 74 },
        "labs": {
            "hba1c": { "value": 7.4, "unit": "%", "date": "2024-01-02" },
            "fasting_glucose": { "value": 118, "unit": "mg/dL" },
            "blood_pressure": { "systolic": 132, "diastolic": 84 }
        },
        "diet_history": [
            { "target_date": "2024-01-12", "nutritional_totals": { "calories": 1750, "carbs": 190, "protein": 95, "fat": 55, "fiber": 27 } },
            { "target_date": "2024-01-13", "nutritional_totals": { "calories": 1820, "carbs": 205, "protein": 90, "fat": 60, "fiber": 31 } },
            { "target_date": "2024-01-14", "meals": [
                { "meal_type": "breakfast", "items": [ { "calories": 380, "carbs": 48, "protein": 18, "fat": 11 } ] },
                { "meal_type": "lunch", "calories": 620, "carbs": 72, "protein": 34, "fat": 19 },
                { "meal_type": "evening snack", "calories": 150, "carbs": 18, "protein": 6, "fat": 5 },
                { "meal_type": "dinner", "calories": 680, "carbs": 64, "protein": 38, "fat": 24 }
            ] }
        ],
        "exercise_history": [
            { "target_date": "2024-01-11", "totals": { "duration_total_min": 30, "calories_total": 210 } },
            { "target_date": "2024-01-12", "totals": { "duration_total_min": 25, "calories_total": 180 } },
            { "target_date": "2024-01-13", "totals": { "duration_total_min": 40, "calories_total": 290 } },
            { "target_date": "2024-01-14", "totals": { "duration_total_min": 35, "calories_total": 250 } },
            { "target_date": "2024-01-15", "totals": { "duration_total_min": 30, "calories_total": 215 } }
        ],
        "lifestyle_history": [ { "target_date": "2024-01-14" }, { "target_date": "2024-01-15" } ],
        "latest_assessment": { "completed_at": "2024-01-08T10:15:00Z", "risk_level": "medium" },
        "disease_data": {
            "disease": "Type 2 Diabetes",
            "last_updated": "2024-01-03T16:40:00Z",
            "answered_questions": 12,
            "total_questions": 12
        },
        "window_days": "7days",
        "anchor_date": "2024-01-15"
    }"#;

    match glyco_insights::insights_from_json(json.to_string()) {
        Ok(report) => print!("{report}"),
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
